//! 运行过程事件与进度输出
//!
//! 编排图在每个节点前后调用注入的 ProgressSink；界面层（CLI、测试通道）自行决定如何展示。
//! 人工检查点也经由 ProgressSink::ask_human，拿不到答案时图会暂停。

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::{AgentRole, HumanChoice};

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// 正在调用模型
    Thinking { agent: AgentRole, turn: usize },
    /// 调用工具
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览）
    Observation { tool: String, preview: String },
    /// 跳转到下一个节点
    Moving { node: String },
    /// 等待人工选择
    WaitingForHuman { prompt: String },
    /// 达到迭代上限，使用兜底答案
    IterationLimit { turns: usize },
    Done,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Thinking { .. } => write!(f, "Agent thinking..."),
            ProgressEvent::ToolCall { tool, .. } => write!(f, "Using {}...", tool),
            ProgressEvent::Observation { tool, .. } => write!(f, "Got result from {}", tool),
            ProgressEvent::Moving { node } => write!(f, "Moving to {}...", node),
            ProgressEvent::WaitingForHuman { .. } => write!(f, "Waiting for human input..."),
            ProgressEvent::IterationLimit { turns } => {
                write!(f, "Iteration limit reached after {} turns", turns)
            }
            ProgressEvent::Done => write!(f, "Done"),
        }
    }
}

/// 进度输出与人工检查点
#[async_trait]
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: &ProgressEvent);

    /// 询问操作者是否进入补充检索；返回 None 表示当前无法同步作答，图将暂停
    async fn ask_human(&self, _prompt: &str) -> Option<HumanChoice> {
        None
    }
}

/// 丢弃所有事件
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    fn report(&self, _event: &ProgressEvent) {}
}

/// 以 tracing 日志输出进度
pub struct LogProgress;

#[async_trait]
impl ProgressSink for LogProgress {
    fn report(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::ToolCall { tool, args } => {
                tracing::info!(tool = %tool, args = %args, "{}", event)
            }
            ProgressEvent::Observation { tool, preview } => {
                tracing::debug!(tool = %tool, preview = %preview, "{}", event)
            }
            _ => tracing::info!("{}", event),
        }
    }
}

/// 推送到通道（接收端已关闭时静默丢弃）
#[async_trait]
impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn report(&self, event: &ProgressEvent) {
        let _ = self.send(event.clone());
    }
}
