//! 核心类型层：错误分类、决策与会话状态、暂停快照

pub mod error;
pub mod state;

pub use error::{AgentError, DecisionError};
pub use state::{
    AgentDecision, AgentRole, ConversationState, HumanChoice, PausedState, RunOutcome,
    FINAL_ANSWER_TOOL,
};
