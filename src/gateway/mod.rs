//! HTTP gateway service / HTTP网关服务
//!
//! Serves the Ollama-shaped routes (`/api/tags`, `/api/generate`) plus the
//! health, index and diagnostic routes, and owns port selection at startup.
//! 提供Ollama风格路由以及健康检查、首页和诊断路由，并负责启动时的端口选择。

pub mod config;
pub mod error;
pub mod handlers;
pub mod http_gateway;
pub mod types;


pub use config::{AppConfig, BackendConfig, CliArgs, HttpConfig};
pub use error::{GatewayError, GatewayResult};
pub use http_gateway::{bind_with_retry, build_router, AppState, HttpGateway};
