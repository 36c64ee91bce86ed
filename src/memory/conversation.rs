//! 对话消息与滚动对话缓冲
//!
//! 缓冲只保留最近 window 条；超过 window + hysteresis 时才一次性剪回 window，避免每次写入都搬移。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致，序列化为小写）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 滚动对话缓冲
#[derive(Clone, Debug)]
pub struct ConversationBuffer {
    messages: Vec<Message>,
    window: usize,
    hysteresis: usize,
}

impl ConversationBuffer {
    pub fn new(window: usize, hysteresis: usize) -> Self {
        Self {
            messages: Vec::new(),
            window,
            hysteresis,
        }
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
        self.prune();
    }

    /// 用持久化内容替换当前缓冲（恢复时使用），同样遵守窗口
    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        if self.messages.len() > self.window {
            let excess = self.messages.len() - self.window;
            self.messages.drain(..excess);
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 最近 k 条（不足 k 条时全部返回）
    pub fn recent(&self, k: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(k);
        &self.messages[start..]
    }

    fn prune(&mut self) {
        if self.messages.len() > self.window + self.hysteresis {
            let excess = self.messages.len() - self.window;
            self.messages.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
