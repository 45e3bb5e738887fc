//! Backend module manifests / 后端模块清单
//!
//! A backend module is described by a small TOML file that names the
//! capabilities it exports and the runtime its `query` talks to:
//!
//! ```toml
//! name = "query"
//! exports = ["query", "LLM_MODEL"]
//!
//! [runtime]
//! kind = "ollama"
//! base_url = "http://127.0.0.1:11434"
//! model = "gemma3"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::runtime::{ModelRuntime, OllamaRuntime, RuntimeError};

/// Export name of the query capability / 查询能力的导出名
pub const QUERY_EXPORT: &str = "query";
/// Environment variable naming the runtime model / 指定运行时模型的环境变量
pub const MODEL_ENV: &str = "LLM_MODEL";
/// Model used when neither env nor manifest name one / 默认模型
pub const DEFAULT_MODEL: &str = "gemma3";
/// Prefix of the text returned when the runtime fails / 运行时失败时返回文本的前缀
pub const ERROR_RESPONSE_PREFIX: &str = "Error generating response: ";

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors while loading a backend module / 加载后端模块时的错误
#[derive(Error, Debug)]
pub enum ModuleLoadError {
    #[error("cannot read module {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse module {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("module exports `query` but declares no [runtime]")]
    MissingRuntime,

    #[error("unsupported runtime kind: {0}")]
    UnsupportedRuntime(String),

    #[error("invalid runtime base_url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("cannot initialise runtime: {0}")]
    Runtime(#[from] RuntimeError),
}

/// On-disk module description / 磁盘上的模块描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    #[serde(default = "default_module_name")]
    pub name: String,
    #[serde(default)]
    pub exports: Vec<String>,
    #[serde(default)]
    pub runtime: Option<RuntimeSection>,
}

/// `[runtime]` section of a manifest / 清单中的 `[runtime]` 部分
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSection {
    #[serde(default = "default_runtime_kind")]
    pub kind: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub model: Option<String>,
    /// No timeout unless set / 未设置时不限制超时
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_module_name() -> String {
    "query".to_string()
}

fn default_runtime_kind() -> String {
    "ollama".to_string()
}

fn default_base_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

impl ModuleManifest {
    pub fn from_file(path: &Path) -> Result<Self, ModuleLoadError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ModuleLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ModuleLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn exports_query(&self) -> bool {
        self.exports.iter().any(|e| e == QUERY_EXPORT)
    }
}

/// A loaded backend module / 已加载的后端模块
pub struct BackendModule {
    name: String,
    exports: Vec<String>,
    runtime: Option<Arc<dyn ModelRuntime>>,
    fail_soft: bool,
}

impl BackendModule {
    /// Load a module from `path`, taking the model from `LLM_MODEL` when set
    /// 从 `path` 加载模块，若设置了 `LLM_MODEL` 则使用其作为模型
    pub fn load(path: &Path, fail_soft: bool) -> Result<Self, ModuleLoadError> {
        let model_override = std::env::var(MODEL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        Self::load_with_model(path, model_override, fail_soft)
    }

    pub fn load_with_model(
        path: &Path,
        model_override: Option<String>,
        fail_soft: bool,
    ) -> Result<Self, ModuleLoadError> {
        let manifest = ModuleManifest::from_file(path)?;

        let runtime = match manifest.runtime.as_ref() {
            Some(section) => Some(build_runtime(section, model_override)?),
            None if manifest.exports_query() => return Err(ModuleLoadError::MissingRuntime),
            None => None,
        };

        Ok(Self::from_parts(
            manifest.name,
            manifest.exports,
            runtime,
            fail_soft,
        ))
    }

    pub fn from_parts(
        name: impl Into<String>,
        exports: Vec<String>,
        runtime: Option<Arc<dyn ModelRuntime>>,
        fail_soft: bool,
    ) -> Self {
        Self {
            name: name.into(),
            exports,
            runtime,
            fail_soft,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runtime(&self) -> Option<&Arc<dyn ModelRuntime>> {
        self.runtime.as_ref()
    }

    /// Whether `query` is both exported and backed by a runtime
    /// `query` 是否已导出且有运行时支持
    pub fn has_query(&self) -> bool {
        self.runtime.is_some() && self.exports.iter().any(|e| e == QUERY_EXPORT)
    }

    /// Exported names, sorted and de-duplicated / 导出名称（排序去重）
    pub fn attributes(&self) -> Vec<String> {
        let mut attrs = self.exports.clone();
        attrs.sort();
        attrs.dedup();
        attrs
    }

    /// The module's `query` capability / 模块的 `query` 能力
    ///
    /// An empty prompt yields `None` without touching the runtime. With
    /// `fail_soft` on, runtime failures come back as text starting with
    /// [`ERROR_RESPONSE_PREFIX`] instead of an error.
    pub async fn query(&self, prompt: &str) -> Result<Option<String>, RuntimeError> {
        if prompt.is_empty() {
            return Ok(None);
        }
        let Some(runtime) = self.runtime.as_ref() else {
            return Ok(None);
        };

        match runtime.generate(prompt).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if self.fail_soft => {
                tracing::warn!(module = %self.name, error = %e, "Error in query function");
                Ok(Some(format!("{}{}", ERROR_RESPONSE_PREFIX, e)))
            }
            Err(e) => Err(e),
        }
    }
}

fn build_runtime(
    section: &RuntimeSection,
    model_override: Option<String>,
) -> Result<Arc<dyn ModelRuntime>, ModuleLoadError> {
    let model = model_override
        .or_else(|| section.model.clone().filter(|m| !m.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    match section.kind.as_str() {
        "ollama" => {
            let base_url =
                Url::parse(&section.base_url).map_err(|e| ModuleLoadError::InvalidBaseUrl {
                    url: section.base_url.clone(),
                    reason: e.to_string(),
                })?;
            if !matches!(base_url.scheme(), "http" | "https") {
                return Err(ModuleLoadError::InvalidBaseUrl {
                    url: section.base_url.clone(),
                    reason: format!("unsupported scheme {}", base_url.scheme()),
                });
            }
            let timeout = section.timeout_ms.map(Duration::from_millis);
            let runtime = OllamaRuntime::new(base_url, model, timeout)?;
            Ok(Arc::new(runtime))
        }
        other => Err(ModuleLoadError::UnsupportedRuntime(other.to_string())),
    }
}
