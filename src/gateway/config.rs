//! Gateway configuration / 网关配置

use anyhow::{bail, Context, Result};
use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::base::{LogConfig, ServerConfig};

/// Prefix for environment overrides, `__` separates nesting
/// 环境变量覆盖前缀，`__` 分隔嵌套层级
pub const ENV_PREFIX: &str = "LLM_GATEWAY_";
/// Well-known port variable / 约定的端口环境变量
pub const PORT_ENV: &str = "PORT";
/// Config file picked up from the working directory when `--config` is absent
/// 未指定 `--config` 时从工作目录读取的配置文件
pub const DEFAULT_CONFIG_FILE: &str = "gateway.toml";

/// Gateway command line arguments / 网关命令行参数
///
/// Every flag is optional; with none given the gateway is driven by
/// `PORT` and the defaults alone.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "llm-gateway",
    version,
    about = "HTTP gateway in front of a local LLM runtime\n本地LLM运行时的HTTP网关"
)]
pub struct CliArgs {
    /// Configuration file path / 配置文件路径
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Bind host / 绑定主机
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// First port to try (overrides PORT) / 首个尝试的端口（覆盖PORT）
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Backend module manifest path / 后端模块清单路径
    #[arg(long, value_name = "PATH")]
    pub module_path: Option<String>,

    /// Log level (trace, debug, info, warn, error) / 日志级别
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log format (pretty, json, compact) / 日志格式
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,
}

/// Gateway application configuration / 网关应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration / HTTP服务器配置
    pub http: HttpConfig,
    /// Logging configuration / 日志配置
    pub logging: LogConfig,
    /// Backend module configuration / 后端模块配置
    pub backend: BackendConfig,
    /// Async runtime sizing / 异步运行时规模
    pub runtime: RuntimeConfig,
    /// Directory of the config file, used to resolve relative paths
    /// 配置文件所在目录，用于解析相对路径
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

/// HTTP gateway configuration / HTTP网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// HTTP server settings / HTTP服务器设置
    pub server: ServerConfig,
    /// Ports tried at startup, starting at `server.port` / 启动时尝试的端口数量
    pub max_port_attempts: u32,
    /// Maximum accepted request body / 最大请求体大小
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            max_port_attempts: 10,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Backend module configuration / 后端模块配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Module manifest path / 模块清单路径
    pub module_path: PathBuf,
    /// Turn runtime failures into response text instead of errors
    /// 将运行时失败转换为响应文本而非错误
    pub fail_soft: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            module_path: PathBuf::from("query.toml"),
            fail_soft: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Tokio worker threads, tokio's default when unset / Tokio工作线程数
    pub worker_threads: Option<usize>,
}

impl AppConfig {
    /// Load configuration with CLI arguments / 使用CLI参数加载配置
    ///
    /// Precedence (highest first) / 优先级（从高到低）:
    /// 1. CLI flags / 命令行参数
    /// 2. `PORT` / 端口环境变量
    /// 3. `LLM_GATEWAY_*` environment / 环境变量
    /// 4. TOML file / 配置文件
    /// 5. Defaults / 默认值
    pub fn load_with_cli(args: &CliArgs) -> Result<Self> {
        let config_path = args.config.as_ref().map(PathBuf::from);

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        match config_path.as_ref() {
            Some(path) => {
                if !path.is_file() {
                    bail!("config file not found: {}", path.display());
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
            }
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: AppConfig = figment
            .extract()
            .context("Failed to load configuration")?;

        if let Ok(v) = std::env::var(PORT_ENV) {
            let v = v.trim();
            if !v.is_empty() {
                config.http.server.port = v
                    .parse::<u16>()
                    .with_context(|| format!("invalid {} value: {:?}", PORT_ENV, v))?;
            }
        }

        // Override with CLI arguments / 使用CLI参数覆盖
        if let Some(host) = &args.host {
            config.http.server.host = host.clone();
        }
        if let Some(port) = args.port {
            config.http.server.port = port;
        }
        if let Some(module_path) = &args.module_path {
            config.backend.module_path = PathBuf::from(module_path);
        }
        if let Some(level) = &args.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &args.log_format {
            config.logging.format = format.clone();
        }

        config.config_dir = config_path
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf());

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration / 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.http.max_port_attempts == 0 {
            bail!("http.max_port_attempts must be at least 1");
        }
        if self.http.max_body_bytes == 0 {
            bail!("http.max_body_bytes must be greater than 0");
        }
        if self.http.server.host.trim().is_empty() {
            bail!("http.server.host must not be empty");
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json" | "compact") {
            bail!(
                "logging.format must be one of pretty, json, compact (got {:?})",
                self.logging.format
            );
        }
        if self.runtime.worker_threads == Some(0) {
            bail!("runtime.worker_threads must be at least 1 when set");
        }
        Ok(())
    }
}
