//! Route handlers / 路由处理器

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::adapter::module::ERROR_RESPONSE_PREFIX;
use crate::adapter::InvocationError;
use crate::gateway::error::GatewayError;
use crate::gateway::http_gateway::AppState;
use crate::gateway::types::{model_catalog, GenerateRequest, GenerateResponse, TagsResponse};

/// Prompt used by the `/test-query` diagnostic / 诊断端点使用的提示词
pub const TEST_PROMPT: &str = "This is a test prompt";

/// Index endpoint / 首页端点
/// GET /
pub async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "LLM gateway is running. Try /health, /api/tags, or /api/generate"
    }))
}

/// CORS preflight / CORS预检
/// OPTIONS on every defined route
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Health check endpoint / 健康检查端点
/// GET /health
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Model catalog / 模型目录
/// GET /api/tags
pub async fn list_models() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: model_catalog(),
    })
}

/// Text generation / 文本生成
/// POST /api/generate
pub async fn generate(State(state): State<AppState>, body: Bytes) -> Response {
    let req = match GenerateRequest::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!(
                error = %e,
                raw = %String::from_utf8_lossy(&body),
                "Error parsing JSON"
            );
            return GatewayError::InvalidJson(e).into_response();
        }
    };

    let model = req.model();
    let prompt = req.prompt();
    info!(model = %model, prompt_len = prompt.len(), "Generating response");

    match state.adapter.query(&prompt).await {
        Ok(result) => {
            let response = result
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| format!("No response generated for: {}", prompt));
            Json(GenerateResponse { response, model }).into_response()
        }
        Err(InvocationError::Unavailable) => Json(GenerateResponse {
            response: format!("Query function not available. Prompt was: {}", prompt),
            model,
        })
        .into_response(),
        Err(InvocationError::Failed(message)) => {
            error!(model = %model, error = %message, "Error generating response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GenerateResponse {
                    response: format!("{}{}", ERROR_RESPONSE_PREFIX, message),
                    model,
                }),
            )
                .into_response()
        }
    }
}

/// Unknown paths / 未知路径
pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Adapter diagnostic / 适配器诊断
/// GET /test-query
pub async fn test_query(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = state.adapter.status();
    if !status.has_query_function {
        return Json(json!({
            "status": "error",
            "has_query_function": false,
            "module_loaded": status.module_loaded,
            "available_attributes": status.available_attributes,
        }));
    }

    match state.adapter.query(TEST_PROMPT).await {
        Ok(result) => Json(json!({
            "status": "success",
            "has_query_function": true,
            "test_result": result,
        })),
        Err(e) => {
            error!(error = %e, "Test query failed");
            Json(json!({
                "status": "error",
                "has_query_function": true,
                "error": e.to_string(),
                "traceback": format!("{:?}", anyhow::Error::new(e)),
            }))
        }
    }
}
