//! 图节点
//!
//! Tool / FinalAnswer 携带待执行的决策（与 decision_log 末尾的待执行项相同），
//! 执行后节点把执行记录追加到 decision_log。

use std::fmt;

use crate::core::{AgentDecision, AgentRole};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    PrimaryAgent,
    SecondaryAgent,
    /// 执行非终止工具
    Tool(AgentDecision),
    /// 执行 final_answer，写入 final_output
    FinalAnswer(AgentDecision),
    /// 迭代上限兜底
    ForcedFinal,
    /// 人工检查点
    Human,
    End,
}

impl Node {
    pub fn agent(role: AgentRole) -> Self {
        match role {
            AgentRole::Primary => Node::PrimaryAgent,
            AgentRole::Secondary => Node::SecondaryAgent,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Node::PrimaryAgent => "primary_agent",
            Node::SecondaryAgent => "secondary_agent",
            Node::Tool(_) => "tool",
            Node::FinalAnswer(_) => "final_answer",
            Node::ForcedFinal => "forced_final",
            Node::Human => "human",
            Node::End => "end",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // 进度里显示具体工具名
            Node::Tool(d) => write!(f, "{}", d.tool_name),
            other => write!(f, "{}", other.name()),
        }
    }
}
