//! Model runtime clients / 模型运行时客户端
//!
//! A runtime is the external inference process that turns a prompt into
//! text. Backend modules own one runtime each; the gateway never talks to a
//! runtime directly.

pub mod ollama;

pub use ollama::OllamaRuntime;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a model runtime call / 模型运行时调用错误
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Could not reach the runtime / 无法连接运行时
    #[error("network error: {0}")]
    Network(String),

    /// Runtime answered with a non-success status / 运行时返回非成功状态
    #[error("upstream status {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Runtime answered with a body we could not decode / 无法解析运行时响应
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP client could not be built / 无法构建HTTP客户端
    #[error("client error: {0}")]
    Client(String),
}

/// Synchronous-from-the-caller's-view text generation
/// 从调用方看为同步的文本生成
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Runtime kind, e.g. `ollama` / 运行时类型
    fn kind(&self) -> &str;

    /// Model the runtime generates with / 运行时使用的模型
    fn model(&self) -> &str;

    /// Generate a completion for `prompt` / 为 `prompt` 生成补全
    async fn generate(&self, prompt: &str) -> Result<String, RuntimeError>;
}
