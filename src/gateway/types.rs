//! Wire types for the gateway routes / 网关路由的传输类型

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Model reported when a request names none / 请求未指定时使用的模型
pub const DEFAULT_MODEL: &str = "gemma3";

/// `POST /api/generate` body / 生成请求体
///
/// Fields take any JSON value. Strings are used as-is, `null` counts as
/// absent, and anything else is rendered as its JSON text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub model: Option<Value>,
    #[serde(default)]
    pub prompt: Option<Value>,
}

impl GenerateRequest {
    /// Force-parse a raw body, whatever its content type
    /// 无论内容类型如何都强制解析原始请求体
    ///
    /// Only a JSON object is accepted; arrays and scalars are rejected even
    /// though serde would map a sequence onto the struct.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "expected a JSON object",
            ));
        }
        serde_json::from_value(value)
    }

    pub fn model(&self) -> String {
        field_text(self.model.as_ref(), DEFAULT_MODEL)
    }

    pub fn prompt(&self) -> String {
        field_text(self.prompt.as_ref(), "")
    }
}

fn field_text(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// `POST /api/generate` reply / 生成响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub model: String,
}

/// Catalog entry / 模型目录条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
}

/// `GET /api/tags` reply / 模型列表响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagsResponse {
    pub models: Vec<ModelDescriptor>,
}

/// The static model catalog / 静态模型目录
pub fn model_catalog() -> Vec<ModelDescriptor> {
    vec![ModelDescriptor {
        name: DEFAULT_MODEL.to_string(),
    }]
}
