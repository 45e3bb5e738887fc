//! Invocation adapter / 调用适配器
//!
//! Isolates the HTTP gateway from whether a backend module is present and
//! what it can do. The adapter is picked once at startup:
//! 在启动时一次性选定适配器：
//!
//! - [`ConnectedAdapter`] when the module loaded and exports `query`
//! - [`StubAdapter`] otherwise (load failure, or no `query` export)
//!
//! Route handlers only ever see `Arc<dyn InvocationAdapter>`.

pub mod connected;
pub mod module;
pub mod stub;

#[cfg(test)]
mod adapter_test;

pub use connected::ConnectedAdapter;
pub use module::{BackendModule, ModuleLoadError, ModuleManifest};
pub use stub::StubAdapter;

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::gateway::config::BackendConfig;

/// Snapshot of what the adapter can do / 适配器能力快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterStatus {
    pub module_loaded: bool,
    pub has_query_function: bool,
    pub available_attributes: Vec<String>,
}

/// Outcome of a failed `query` / `query` 失败的结果
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// No usable query capability; callers degrade softly
    /// 无可用查询能力；调用方应软降级
    #[error("query function not available")]
    Unavailable,

    /// The backend call itself failed / 后端调用本身失败
    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait InvocationAdapter: Send + Sync {
    fn status(&self) -> AdapterStatus;

    /// Run `prompt` through the backend. `Ok(None)` means the backend
    /// produced nothing.
    async fn query(&self, prompt: &str) -> Result<Option<String>, InvocationError>;
}

/// Resolve the module path against `base_dir` when it is relative
/// 当模块路径为相对路径时基于 `base_dir` 解析
pub fn resolve_module_path(module_path: &Path, base_dir: Option<&Path>) -> PathBuf {
    if module_path.is_absolute() {
        return module_path.to_path_buf();
    }
    match base_dir {
        Some(dir) => dir.join(module_path),
        None => module_path.to_path_buf(),
    }
}

/// Load the backend module and pick the adapter variant
/// 加载后端模块并选择适配器变体
///
/// Never fails: any load error is logged and yields a [`StubAdapter`].
pub fn load_adapter(config: &BackendConfig, base_dir: Option<&Path>) -> Arc<dyn InvocationAdapter> {
    let path = resolve_module_path(&config.module_path, base_dir);
    select_adapter(&path, BackendModule::load(&path, config.fail_soft))
}

fn select_adapter(
    path: &Path,
    loaded: Result<BackendModule, ModuleLoadError>,
) -> Arc<dyn InvocationAdapter> {
    match loaded {
        Ok(module) if module.has_query() => {
            if let Some(runtime) = module.runtime() {
                info!(
                    path = %path.display(),
                    module = %module.name(),
                    runtime = %runtime.kind(),
                    model = %runtime.model(),
                    "Query module loaded successfully"
                );
            }
            Arc::new(ConnectedAdapter::new(module))
        }
        Ok(module) => {
            warn!(
                path = %path.display(),
                module = %module.name(),
                attributes = ?module.attributes(),
                "Query module loaded without a query function"
            );
            Arc::new(StubAdapter::without_query(module.attributes()))
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Error loading query module");
            Arc::new(StubAdapter::not_loaded())
        }
    }
}
