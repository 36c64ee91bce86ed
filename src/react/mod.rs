//! 认知层：决策解析、Planner（提示词拼装与模型调用）、进度事件

pub mod events;
pub mod parser;
pub mod planner;

pub use events::{LogProgress, NoopProgress, ProgressEvent, ProgressSink};
pub use parser::{parse_decision, FALLBACK_APOLOGY};
pub use planner::{query_reminder, AgentPrompts, Planner};
