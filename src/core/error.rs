//! 错误类型：决策解析错误与运行级错误
//!
//! DecisionError 覆盖「模型输出 → AgentDecision」的全部失败；AgentError 是编排图对调用方暴露的统一错误。
//! 二者都不会被图自动重试，由调用方决定如何降级展示。

use thiserror::Error;

use crate::llm::LlmError;

/// 决策解析失败（统一归为 DecisionParseError 类别）
#[derive(Error, Debug)]
pub enum DecisionError {
    #[error("Empty response from LLM")]
    EmptyResponse,

    /// 保留原始文本，便于排查模型输出
    #[error("Invalid JSON response from LLM: {raw}")]
    MalformedJson {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid response format. Expected 'name' and 'parameters' fields but got: {parsed}")]
    InvalidSchema { parsed: serde_json::Value },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// 一次运行中可能出现的致命错误（迭代上限不在此列，它由图内部兜底）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Could not parse agent decision: {0}")]
    DecisionParse(#[from] DecisionError),

    #[error("Tool `{tool}` failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("LLM request timed out after {0}s")]
    LlmTimeout(u64),

    #[error("Invalid human choice: {0}")]
    InvalidHumanChoice(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl AgentError {
    /// 是否属于解析类错误（含未知工具）
    pub fn is_decision_error(&self) -> bool {
        matches!(self, AgentError::DecisionParse(_))
    }
}
