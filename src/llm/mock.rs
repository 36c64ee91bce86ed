//! Mock / 脚本化 LLM 客户端（用于离线演示与测试，无需 API）
//!
//! - MockLlmClient：取最后一条 User 消息，回显为 final_answer 决策
//! - ScriptedLlmClient：按顺序回放预设回复，最后一条会一直重复；记录调用次数与收到的消息

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, ResponseFormat};
use crate::memory::{Message, Role};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        _format: ResponseFormat,
    ) -> Result<String, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(serde_json::json!({
            "name": "final_answer",
            "parameters": { "text": format!("Echo from Mock: {last_user}") }
        })
        .to_string())
    }

    fn model(&self) -> &str {
        "mock"
    }
}

/// 脚本化客户端
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// 永远返回同一条回复
    pub fn repeating(response: impl Into<String>) -> Self {
        Self::new([response.into()])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 每次调用收到的完整消息序列
    pub fn seen_messages(&self) -> Vec<Vec<Message>> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        _format: ResponseFormat,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(messages.to_vec());

        let mut queue = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        match queue.len() {
            0 => Err(LlmError::EmptyChoices),
            1 => Ok(queue[0].clone()),
            _ => Ok(queue.pop_front().unwrap_or_default()),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
