//! Ollama 本地模型客户端
//!
//! 调用原生 `/api/chat`（非流式）；ResponseFormat::Json 时传 `format: "json"`，由 Ollama 约束解码。
//! - 默认地址: http://localhost:11434
//! - 默认模型: gemma3:4b

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm::{LlmClient, LlmError, ResponseFormat};
use crate::memory::Message;

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const OLLAMA_DEFAULT_MODEL: &str = "gemma3:4b";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<&str>, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url
                .unwrap_or(OLLAMA_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(
        &self,
        messages: &[Message],
        format: ResponseFormat,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format: match format {
                ResponseFormat::Json => Some("json"),
                ResponseFormat::Text => None,
            },
        };
        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {status}: {detail}")));
        }
        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Api(format!("Read body: {e}")))?;
        Ok(parsed.message.map(|m| m.content).unwrap_or_default())
    }

    fn model(&self) -> &str {
        &self.model
    }
}
