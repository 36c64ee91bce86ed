//! 路由边：纯函数，只读 ConversationState 决定下一个节点
//!
//! 迭代上限在「进入智能体节点之前」统一检查：agent_turns 已达上限时转到 ForcedFinal。

use serde::{Deserialize, Serialize};

use crate::config::default_uncertainty_markers;
use crate::core::{AgentDecision, AgentRole, ConversationState, HumanChoice};
use crate::workflow::Node;

/// Primary 给出最终答案后是否进入 SecondaryAgent 补充检索
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentPolicy {
    /// 答案含不确定性标记时补充
    #[default]
    Heuristic,
    /// 总是补充一次
    Always,
    /// 交给人工决定
    Human,
}

/// 不确定性判断：大小写不敏感的子串匹配
#[derive(Debug, Clone)]
pub struct UncertaintyHeuristic {
    markers: Vec<String>,
}

impl UncertaintyHeuristic {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn is_uncertain(&self, answer: &str) -> bool {
        let answer = answer.to_lowercase();
        self.markers.iter().any(|m| answer.contains(m.as_str()))
    }
}

impl Default for UncertaintyHeuristic {
    fn default() -> Self {
        Self::new(default_uncertainty_markers())
    }
}

/// 进入某个智能体前的迭代上限检查
pub fn enter_agent(state: &ConversationState, role: AgentRole, max_agent_turns: usize) -> Node {
    if state.agent_turns >= max_agent_turns {
        Node::ForcedFinal
    } else {
        Node::agent(role)
    }
}

/// 智能体之后：final_answer → FinalAnswer，其余工具 → Tool
pub fn route_after_agent(decision: AgentDecision) -> Node {
    if decision.is_final() {
        Node::FinalAnswer(decision)
    } else {
        Node::Tool(decision)
    }
}

/// 工具执行后回到当前活跃的智能体
pub fn route_after_tool(state: &ConversationState, max_agent_turns: usize) -> Node {
    enter_agent(state, state.active_agent, max_agent_turns)
}

/// 最终答案之后：Secondary 的答案直接结束，Primary 的答案按策略决定是否补充
pub fn route_after_final(
    state: &ConversationState,
    policy: EnrichmentPolicy,
    heuristic: &UncertaintyHeuristic,
    max_agent_turns: usize,
) -> Node {
    if state.active_agent == AgentRole::Secondary || state.iteration_limit_hit {
        return Node::End;
    }
    match policy {
        EnrichmentPolicy::Always => enter_agent(state, AgentRole::Secondary, max_agent_turns),
        EnrichmentPolicy::Human => Node::Human,
        EnrichmentPolicy::Heuristic => {
            let answer = state.final_text().unwrap_or_default();
            if heuristic.is_uncertain(answer) {
                enter_agent(state, AgentRole::Secondary, max_agent_turns)
            } else {
                Node::End
            }
        }
    }
}

pub fn route_after_human(
    state: &ConversationState,
    choice: HumanChoice,
    max_agent_turns: usize,
) -> Node {
    match choice {
        HumanChoice::Continue => enter_agent(state, AgentRole::Secondary, max_agent_turns),
        HumanChoice::End => Node::End,
    }
}
