//! Error types for the HTTP gateway
//! HTTP网关的错误类型

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Body is not decodable as a request / 请求体无法解析
    #[error("Invalid JSON data")]
    InvalidJson(#[source] serde_json::Error),

    /// Body could not be read within the limit / 请求体超出限制或无法读取
    #[error("Request body exceeds {limit} bytes or could not be read")]
    BodyTooLarge { limit: usize },

    /// Bind failed for a reason other than "address in use"
    /// 绑定失败（非端口占用原因）
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Every port tried was already in use / 所有尝试的端口均被占用
    #[error(
        "Failed to find an available port after {attempts} attempts (tried {first_port}-{last_port})"
    )]
    PortsExhausted {
        first_port: u16,
        last_port: u16,
        attempts: u32,
    },

    /// The server loop failed after binding / 绑定后服务循环失败
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            GatewayError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Bind { .. }
            | GatewayError::PortsExhausted { .. }
            | GatewayError::Serve(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
