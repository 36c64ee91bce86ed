//! 状态定义：AgentDecision、ConversationState 与暂停快照
//!
//! ConversationState 是在编排图中逐节点传递的值，每次用户提问新建一份；
//! 可整体序列化，以便 HumanNode 暂停后跨请求恢复。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::memory::Message;

/// 终止型工具名：其出现意味着图可以结束
pub const FINAL_ANSWER_TOOL: &str = "final_answer";

/// 一次模型调用解析后的决策（执行前 tool_output 为 None）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentDecision {
    pub tool_name: String,
    pub tool_input: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<String>,
}

impl AgentDecision {
    pub fn new(tool_name: impl Into<String>, tool_input: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_input,
            tool_output: None,
        }
    }

    /// 构造 final_answer 决策：`{"text": ...}`
    pub fn final_answer(text: impl Into<String>) -> Self {
        let mut input = Map::new();
        input.insert("text".to_string(), Value::String(text.into()));
        Self::new(FINAL_ANSWER_TOOL, input)
    }

    pub fn is_final(&self) -> bool {
        self.tool_name == FINAL_ANSWER_TOOL
    }

    pub fn is_executed(&self) -> bool {
        self.tool_output.is_some()
    }

    /// 消费待执行决策，产出带输出的历史记录（原决策不再存在，也就无从被重复执行）
    pub fn executed(self, output: impl Into<String>) -> Self {
        Self {
            tool_output: Some(output.into()),
            ..self
        }
    }

    /// 决策的 wire 形态 `{"name": ..., "parameters": {...}}`，用于回放给模型
    pub fn to_call_json(&self) -> String {
        serde_json::json!({
            "name": self.tool_name,
            "parameters": self.tool_input,
        })
        .to_string()
    }
}

/// 当前由哪个智能体做决策；非终止工具执行后回到该智能体
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Primary,
    Secondary,
}

/// 在图中传递的会话状态
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_query: String,
    /// 调用方维护的历史，图只读
    pub chat_history: Vec<Message>,
    /// 本次运行的全部决策（含 final_answer），只追加：
    /// AgentNode 追加待执行决策，执行节点再追加带 tool_output 的执行记录
    pub decision_log: Vec<AgentDecision>,
    pub final_output: Option<AgentDecision>,
    pub active_agent: AgentRole,
    pub agent_turns: usize,
    pub iteration_limit_hit: bool,
}

impl ConversationState {
    pub fn new(user_query: impl Into<String>, chat_history: Vec<Message>) -> Self {
        Self {
            user_query: user_query.into(),
            chat_history,
            decision_log: Vec::new(),
            final_output: None,
            active_agent: AgentRole::Primary,
            agent_turns: 0,
            iteration_limit_hit: false,
        }
    }

    pub fn last_decision(&self) -> Option<&AgentDecision> {
        self.decision_log.last()
    }

    pub fn push_decision(&mut self, decision: AgentDecision) {
        self.decision_log.push(decision);
    }

    /// 日志中所有已执行的 final_answer 文本，按产生顺序
    pub fn answers(&self) -> Vec<&str> {
        self.decision_log
            .iter()
            .filter(|d| d.is_final())
            .filter_map(|d| d.tool_output.as_deref())
            .collect()
    }

    pub fn final_text(&self) -> Option<&str> {
        self.final_output
            .as_ref()
            .and_then(|d| d.tool_output.as_deref())
    }

    /// 本次运行中实际执行过的工具调用数（不含 final_answer）
    pub fn tool_calls(&self) -> usize {
        self.decision_log
            .iter()
            .filter(|d| d.is_executed() && !d.is_final())
            .count()
    }
}

/// 人工检查点的选择
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanChoice {
    /// 进入 SecondaryAgent 补充检索
    Continue,
    End,
}

impl HumanChoice {
    /// 解析操作者输入；不区分大小写
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "continue" | "secondary" | "yes" | "y" => Some(Self::Continue),
            "end" | "stop" | "no" | "n" => Some(Self::End),
            _ => None,
        }
    }
}

/// HumanNode 暂停时返回给调用方的快照，resume 时原样交回
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PausedState {
    pub run_id: Uuid,
    pub prompt: String,
    pub state: ConversationState,
}

/// 一次 run / resume 的结果
#[derive(Clone, Debug)]
pub enum RunOutcome {
    Completed(String),
    Paused(PausedState),
}

impl RunOutcome {
    pub fn answer(&self) -> Option<&str> {
        match self {
            RunOutcome::Completed(text) => Some(text),
            RunOutcome::Paused(_) => None,
        }
    }
}
