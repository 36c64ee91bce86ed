//! LLM 客户端抽象
//!
//! 所有后端（Ollama / OpenAI 兼容 / Mock）实现 LlmClient：输入按角色标注的消息序列与期望的回复格式，
//! 返回单条 assistant 文本。编排图不关心具体是哪家提供方。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 回复格式提示：Json 时后端应尽量约束模型只输出 JSON
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("response contained no choices")]
    EmptyChoices,
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        format: ResponseFormat,
    ) -> Result<String, LlmError>;

    /// 模型名（日志用）
    fn model(&self) -> &str {
        "unknown"
    }
}
