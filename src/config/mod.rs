//! Configuration and logging bootstrap shared by the gateway binary
//! 网关二进制共享的配置与日志初始化
//!
//! Service-specific configuration (routes, backend module, runtime sizing)
//! lives in `crate::gateway::config`; this module only holds the pieces that
//! are independent of the HTTP surface.
//! 服务相关配置位于 `crate::gateway::config`；此模块只包含与HTTP层无关的部分。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::format::{Compact, DefaultFields, Format};

/// Base configuration structures / 基础配置结构
pub mod base;
pub use base::*;

/// Common logging configuration / 通用日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) / 日志级别
    pub level: String,
    /// Log format (json, pretty, compact) / 日志格式
    pub format: String,
    /// Enable file logging / 启用文件日志
    pub file_enabled: bool,
    /// Log file path / 日志文件路径
    pub file_path: Option<PathBuf>,
}

static FILE_LOG_GUARD: Mutex<Option<WorkerGuard>> = Mutex::new(None);

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_enabled: false,
            file_path: None,
        }
    }
}

/// Initialize tracing based on logging configuration
/// 基于日志配置初始化跟踪
///
/// `RUST_LOG` takes precedence over `config.level` when it is set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.level.trim().is_empty() {
            EnvFilter::new("info")
        } else {
            EnvFilter::new(config.level.clone())
        }
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let file_writer = match (config.file_enabled, config.file_path.as_ref()) {
        (true, Some(path)) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create log dir: {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file: {}", path.display()))?;
            let (file_writer, guard) = tracing_appender::non_blocking(file);
            // The first installed sink keeps its guard.
            if let Ok(mut slot) = FILE_LOG_GUARD.lock() {
                if slot.is_none() {
                    *slot = Some(guard);
                }
            }
            Some(file_writer)
        }
        _ => None,
    };

    match config.format.as_str() {
        "json" => {
            let stdout_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_timer(tracing_subscriber::fmt::time::uptime())
                .with_level(true);
            registry
                .with(stdout_layer)
                .with(file_writer.map(file_layer))
                .try_init()?;
        }
        "compact" => {
            let stdout_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_timer(tracing_subscriber::fmt::time::uptime())
                .with_level(true);
            registry
                .with(stdout_layer)
                .with(file_writer.map(file_layer))
                .try_init()?;
        }
        _ => {
            let stdout_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_timer(tracing_subscriber::fmt::time::uptime())
                .with_level(true);
            registry
                .with(stdout_layer)
                .with(file_writer.map(file_layer))
                .try_init()?;
        }
    }

    Ok(())
}

type FileLayer<S> = tracing_subscriber::fmt::Layer<S, DefaultFields, Format<Compact>, NonBlocking>;

/// The file sink always writes compact lines; only stdout follows `format`.
/// 文件输出始终为compact格式；只有标准输出遵循 `format`。
fn file_layer<S>(writer: NonBlocking) -> FileLayer<S> {
    tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_writer(writer)
}

/// Flush and close the file sink, if any / 刷新并关闭文件日志输出
///
/// Call before the process exits; buffered lines are lost otherwise.
pub fn shutdown_tracing() {
    let guard = FILE_LOG_GUARD.lock().ok().and_then(|mut slot| slot.take());
    drop(guard);
}
