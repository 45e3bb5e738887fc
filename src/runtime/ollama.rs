use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::runtime::{ModelRuntime, RuntimeError};

/// Ollama `/api/generate` client / Ollama `/api/generate` 客户端
pub struct OllamaRuntime {
    base_url: Url,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateReply {
    #[serde(default)]
    response: String,
}

impl OllamaRuntime {
    pub fn new(
        base_url: Url,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, RuntimeError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| RuntimeError::Client(e.to_string()))?;
        Ok(Self {
            base_url,
            model: model.into(),
            client,
        })
    }

    fn join_url(&self, path: &str) -> String {
        let mut base = self.base_url.as_str().trim_end_matches('/').to_string();
        base.push('/');
        base.push_str(path.trim_start_matches('/'));
        base
    }

    fn extract_error_message(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<serde_json::Value>(body)
            .ok()?
            .get("error")
            .and_then(|x| x.as_str())
            .map(|s| s.to_string())
    }
}

#[async_trait]
impl ModelRuntime for OllamaRuntime {
    fn kind(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, RuntimeError> {
        let url = self.join_url("api/generate");
        let body = OllamaGenerateBody {
            model: &self.model,
            prompt,
            stream: false,
        };

        tracing::debug!(url = %url, model = %self.model, "Calling ollama generate");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RuntimeError::Network(e.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RuntimeError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = Self::extract_error_message(&bytes)
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).trim().to_string());
            return Err(RuntimeError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let reply: OllamaGenerateReply = serde_json::from_slice(&bytes)
            .map_err(|e| RuntimeError::InvalidResponse(e.to_string()))?;
        Ok(reply.response)
    }
}
