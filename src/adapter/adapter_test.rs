//! Tests for module loading and adapter selection
//! 模块加载与适配器选择的测试

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use crate::adapter::module::{BackendModule, ModuleLoadError, ERROR_RESPONSE_PREFIX};
use crate::adapter::{
    load_adapter, resolve_module_path, ConnectedAdapter, InvocationAdapter, InvocationError,
    StubAdapter,
};
use crate::gateway::config::BackendConfig;
use crate::runtime::{ModelRuntime, RuntimeError};

/// Runtime double that counts calls / 计数调用的运行时替身
struct FakeRuntime {
    reply: Result<String, String>,
    calls: AtomicUsize,
}

impl FakeRuntime {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ModelRuntime for FakeRuntime {
    fn kind(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn generate(&self, prompt: &str) -> Result<String, RuntimeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(format!("{text}:{prompt}")),
            Err(message) => Err(RuntimeError::Network(message.clone())),
        }
    }
}

fn write_module(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("query.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn backend_config(module_path: &Path) -> BackendConfig {
    BackendConfig {
        module_path: module_path.to_path_buf(),
        fail_soft: true,
    }
}

const VALID_MODULE: &str = r#"
name = "query"
exports = ["query", "LLM_MODEL", "get_prompt"]

[runtime]
kind = "ollama"
base_url = "http://127.0.0.1:9"
model = "gemma3"
"#;

#[tokio::test]
async fn test_missing_module_falls_back_to_stub() {
    let dir = TempDir::new().unwrap();
    let adapter = load_adapter(&backend_config(&dir.path().join("absent.toml")), None);

    let status = adapter.status();
    assert!(!status.module_loaded);
    assert!(!status.has_query_function);
    assert!(status.available_attributes.is_empty());
    assert_eq!(
        adapter.query("hello").await,
        Err(InvocationError::Unavailable)
    );
}

#[tokio::test]
async fn test_broken_module_falls_back_to_stub() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir, "name = \"query\"\nexports = [\"query\"\n");

    let err = BackendModule::load_with_model(&path, None, true).err().unwrap();
    assert!(matches!(err, ModuleLoadError::Parse { .. }));

    let adapter = load_adapter(&backend_config(&path), None);
    assert!(!adapter.status().module_loaded);
}

#[test]
fn test_module_without_runtime_section_exporting_query_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir, "exports = [\"query\"]\n");

    let err = BackendModule::load_with_model(&path, None, true).err().unwrap();
    assert!(matches!(err, ModuleLoadError::MissingRuntime));
}

#[test]
fn test_unsupported_runtime_kind_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_module(
        &dir,
        "exports = [\"query\"]\n[runtime]\nkind = \"vllm\"\n",
    );

    let err = BackendModule::load_with_model(&path, None, true).err().unwrap();
    assert!(matches!(err, ModuleLoadError::UnsupportedRuntime(kind) if kind == "vllm"));
}

#[test]
fn test_invalid_base_url_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_module(
        &dir,
        "exports = [\"query\"]\n[runtime]\nbase_url = \"ftp://127.0.0.1\"\n",
    );

    let err = BackendModule::load_with_model(&path, None, true).err().unwrap();
    assert!(matches!(err, ModuleLoadError::InvalidBaseUrl { .. }));
}

#[tokio::test]
async fn test_module_without_query_export_reports_attributes() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir, "exports = [\"get_prompt\", \"LLM_MODEL\", \"get_prompt\"]\n");

    let adapter = load_adapter(&backend_config(&path), None);
    let status = adapter.status();
    assert!(status.module_loaded);
    assert!(!status.has_query_function);
    assert_eq!(status.available_attributes, vec!["LLM_MODEL", "get_prompt"]);
    assert_eq!(adapter.query("x").await, Err(InvocationError::Unavailable));
}

#[tokio::test]
async fn test_valid_module_connects() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir, VALID_MODULE);

    let adapter = load_adapter(&backend_config(&path), None);
    let status = adapter.status();
    assert!(status.module_loaded);
    assert!(status.has_query_function);
    assert_eq!(
        status.available_attributes,
        vec!["LLM_MODEL", "get_prompt", "query"]
    );

    // Empty prompts never reach the runtime, so the dead base_url is fine.
    assert_eq!(adapter.query("").await, Ok(None));
}

#[test]
fn test_model_override_wins_over_manifest() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir, VALID_MODULE);

    let module = BackendModule::load_with_model(&path, Some("llama3".to_string()), true).unwrap();
    assert_eq!(module.runtime().unwrap().model(), "llama3");

    let module = BackendModule::load_with_model(&path, None, true).unwrap();
    assert_eq!(module.runtime().unwrap().model(), "gemma3");
}

#[test]
fn test_manifest_model_defaults_to_gemma3() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir, "exports = [\"query\"]\n[runtime]\nkind = \"ollama\"\n");

    let module = BackendModule::load_with_model(&path, None, true).unwrap();
    assert_eq!(module.name(), "query");
    assert_eq!(module.runtime().unwrap().model(), "gemma3");
}

#[tokio::test]
async fn test_connected_adapter_delegates_to_runtime() {
    let runtime = FakeRuntime::ok("generated");
    let module = BackendModule::from_parts(
        "query",
        vec!["query".to_string()],
        Some(runtime.clone()),
        true,
    );
    let adapter = ConnectedAdapter::new(module);

    assert_eq!(
        adapter.query("hi").await,
        Ok(Some("generated:hi".to_string()))
    );
    assert_eq!(adapter.query("").await, Ok(None));
    assert_eq!(runtime.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fail_soft_turns_runtime_error_into_text() {
    let module = BackendModule::from_parts(
        "query",
        vec!["query".to_string()],
        Some(FakeRuntime::failing("connection refused")),
        true,
    );
    let adapter = ConnectedAdapter::new(module);

    let text = adapter.query("hi").await.unwrap().unwrap();
    assert!(text.starts_with(ERROR_RESPONSE_PREFIX));
    assert!(text.contains("connection refused"));
}

#[tokio::test]
async fn test_strict_mode_surfaces_runtime_error() {
    let module = BackendModule::from_parts(
        "query",
        vec!["query".to_string()],
        Some(FakeRuntime::failing("boom")),
        false,
    );
    let adapter = ConnectedAdapter::new(module);

    match adapter.query("hi").await {
        Err(InvocationError::Failed(message)) => assert!(message.contains("boom")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_stub_adapter_states() {
    let stub = StubAdapter::not_loaded();
    assert!(!stub.status().module_loaded);

    let stub = StubAdapter::without_query(vec!["helper".to_string()]);
    let status = stub.status();
    assert!(status.module_loaded);
    assert!(!status.has_query_function);
    assert_eq!(status.available_attributes, vec!["helper"]);
}

#[test]
fn test_resolve_module_path() {
    let base = Path::new("/etc/llm-gateway");
    assert_eq!(
        resolve_module_path(Path::new("query.toml"), Some(base)),
        PathBuf::from("/etc/llm-gateway/query.toml")
    );
    assert_eq!(
        resolve_module_path(Path::new("/opt/query.toml"), Some(base)),
        PathBuf::from("/opt/query.toml")
    );
    assert_eq!(
        resolve_module_path(Path::new("query.toml"), None),
        PathBuf::from("query.toml")
    );
}
