//! 按配置选择 LLM 后端
//!
//! provider 取值：ollama（默认）/ openai / groq / gemini / mock。
//! 托管服务的 API Key 只从环境变量读取（可放在 .env 中）：OPENAI_API_KEY、GROQ_API_KEY、GEMINI_API_KEY。

use std::sync::Arc;

use crate::config::LlmSection;
use crate::core::AgentError;
use crate::llm::{
    LlmClient, MockLlmClient, OllamaClient, OpenAiClient, GEMINI_BASE_URL, GROQ_BASE_URL,
    OLLAMA_DEFAULT_MODEL, OPENAI_BASE_URL,
};

pub const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

fn api_key(var: &str, provider: &str) -> Result<String, AgentError> {
    std::env::var(var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            AgentError::Config(format!("{var} is required when using the {provider} provider"))
        })
}

/// 根据 [llm] 段创建客户端；未知 provider 或缺少 Key 时返回 Config 错误
pub fn create_llm_from_config(cfg: &LlmSection) -> Result<Arc<dyn LlmClient>, AgentError> {
    let provider = cfg.provider.trim().to_lowercase();
    let model_or = |default: &str| cfg.model.clone().unwrap_or_else(|| default.to_string());

    let client: Arc<dyn LlmClient> = match provider.as_str() {
        "ollama" => Arc::new(OllamaClient::new(
            cfg.base_url.as_deref(),
            &model_or(OLLAMA_DEFAULT_MODEL),
        )),
        "openai" => Arc::new(OpenAiClient::new(
            cfg.base_url.as_deref().unwrap_or(OPENAI_BASE_URL),
            &model_or(OPENAI_DEFAULT_MODEL),
            &api_key("OPENAI_API_KEY", "openai")?,
        )),
        "groq" => Arc::new(OpenAiClient::new(
            cfg.base_url.as_deref().unwrap_or(GROQ_BASE_URL),
            &model_or(GROQ_DEFAULT_MODEL),
            &api_key("GROQ_API_KEY", "groq")?,
        )),
        "gemini" => Arc::new(OpenAiClient::new(
            cfg.base_url.as_deref().unwrap_or(GEMINI_BASE_URL),
            &model_or(GEMINI_DEFAULT_MODEL),
            &api_key("GEMINI_API_KEY", "gemini")?,
        )),
        "mock" => Arc::new(MockLlmClient),
        other => {
            return Err(AgentError::Config(format!(
                "Unsupported LLM provider: {other}"
            )))
        }
    };
    tracing::info!(provider = %provider, model = %client.model(), "LLM backend selected");
    Ok(client)
}
