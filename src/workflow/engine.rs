//! 编排图执行引擎
//!
//! 一次运行是严格串行的节点链：PrimaryAgent →(Tool → PrimaryAgent)* → FinalAnswer
//! →[SecondaryAgent →(Tool → SecondaryAgent)* → FinalAnswer]→ End。
//! 解析失败、工具失败、模型超时都原样返回给调用方，图内不重试；迭代上限由 ForcedFinal 兜底。

use std::sync::Arc;

use uuid::Uuid;

use crate::core::{
    AgentDecision, AgentError, AgentRole, ConversationState, HumanChoice, PausedState, RunOutcome,
};
use crate::memory::{MemoryStore, Message};
use crate::react::{Planner, ProgressEvent, ProgressSink};
use crate::tools::ToolExecutor;
use crate::workflow::router::{
    route_after_agent, route_after_final, route_after_human, route_after_tool,
};
use crate::workflow::{EnrichmentPolicy, Node, UncertaintyHeuristic};

/// 迭代上限且 Primary 尚无答案时的兜底文本
pub const ITERATION_LIMIT_ANSWER: &str = "I was unable to fully resolve your question within the allowed number of steps. Please try rephrasing it or asking something more specific.";

const OBSERVATION_PREVIEW_CHARS: usize = 200;

fn preview(text: &str) -> String {
    if text.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!("{}...", text.chars().take(OBSERVATION_PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

pub struct OrchestrationGraph {
    pub(crate) planner: Planner,
    pub(crate) executor: ToolExecutor,
    pub(crate) memory: Arc<MemoryStore>,
    pub(crate) policy: EnrichmentPolicy,
    pub(crate) heuristic: UncertaintyHeuristic,
    pub(crate) max_agent_turns: usize,
    pub(crate) progress: Arc<dyn ProgressSink>,
}

impl OrchestrationGraph {
    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn policy(&self) -> EnrichmentPolicy {
        self.policy
    }

    pub fn max_agent_turns(&self) -> usize {
        self.max_agent_turns
    }

    /// 处理一个新问题；history 由调用方维护，图只读
    pub async fn run(
        &self,
        user_query: &str,
        chat_history: Vec<Message>,
    ) -> Result<RunOutcome, AgentError> {
        Ok(self.run_with_state(user_query, chat_history).await?.0)
    }

    /// 同 run，另外返回结束（或暂停）时的完整状态，便于审计 decision_log
    pub async fn run_with_state(
        &self,
        user_query: &str,
        chat_history: Vec<Message>,
    ) -> Result<(RunOutcome, ConversationState), AgentError> {
        let run_id = Uuid::new_v4();
        let state = ConversationState::new(user_query, chat_history);
        tracing::info!(%run_id, query = %user_query, policy = ?self.policy, "run started");
        self.drive(run_id, state, Node::PrimaryAgent).await
    }

    /// 从人工检查点继续；choice 不可识别时返回 InvalidHumanChoice
    pub async fn resume(
        &self,
        paused: PausedState,
        choice: &str,
    ) -> Result<RunOutcome, AgentError> {
        Ok(self.resume_with_state(paused, choice).await?.0)
    }

    pub async fn resume_with_state(
        &self,
        paused: PausedState,
        choice: &str,
    ) -> Result<(RunOutcome, ConversationState), AgentError> {
        let parsed = HumanChoice::parse(choice)
            .ok_or_else(|| AgentError::InvalidHumanChoice(choice.to_string()))?;
        tracing::info!(run_id = %paused.run_id, choice = ?parsed, "run resumed");
        let next = route_after_human(&paused.state, parsed, self.max_agent_turns);
        self.report_move(&next);
        self.drive(paused.run_id, paused.state, next).await
    }

    async fn drive(
        &self,
        run_id: Uuid,
        mut state: ConversationState,
        mut node: Node,
    ) -> Result<(RunOutcome, ConversationState), AgentError> {
        loop {
            let next = match node {
                Node::PrimaryAgent => self.agent_step(&mut state, AgentRole::Primary).await?,
                Node::SecondaryAgent => self.agent_step(&mut state, AgentRole::Secondary).await?,
                Node::Tool(decision) => {
                    self.tool_step(&mut state, decision).await?;
                    route_after_tool(&state, self.max_agent_turns)
                }
                Node::FinalAnswer(decision) => {
                    self.final_step(&mut state, decision).await?;
                    route_after_final(&state, self.policy, &self.heuristic, self.max_agent_turns)
                }
                Node::ForcedFinal => {
                    self.forced_final_step(&mut state);
                    Node::End
                }
                Node::Human => {
                    let prompt = human_prompt(&state);
                    self.progress.report(&ProgressEvent::WaitingForHuman {
                        prompt: prompt.clone(),
                    });
                    match self.progress.ask_human(&prompt).await {
                        Some(choice) => route_after_human(&state, choice, self.max_agent_turns),
                        None => {
                            tracing::info!(%run_id, "run paused for human input");
                            let paused = PausedState {
                                run_id,
                                prompt,
                                state: state.clone(),
                            };
                            return Ok((RunOutcome::Paused(paused), state));
                        }
                    }
                }
                Node::End => {
                    let answer = state
                        .final_text()
                        .map(str::to_string)
                        .unwrap_or_else(|| ITERATION_LIMIT_ANSWER.to_string());
                    tracing::info!(
                        %run_id,
                        agent_turns = state.agent_turns,
                        tool_calls = state.tool_calls(),
                        limit_hit = state.iteration_limit_hit,
                        "run completed"
                    );
                    self.progress.report(&ProgressEvent::Done);
                    return Ok((RunOutcome::Completed(answer), state));
                }
            };
            self.report_move(&next);
            node = next;
        }
    }

    fn report_move(&self, next: &Node) {
        if *next != Node::End {
            self.progress.report(&ProgressEvent::Moving {
                node: next.to_string(),
            });
        }
    }

    async fn agent_step(
        &self,
        state: &mut ConversationState,
        role: AgentRole,
    ) -> Result<Node, AgentError> {
        state.active_agent = role;
        state.agent_turns += 1;
        self.progress.report(&ProgressEvent::Thinking {
            agent: role,
            turn: state.agent_turns,
        });
        let decision = self.planner.decide(role, state).await?;
        state.push_decision(decision.clone());
        Ok(route_after_agent(decision))
    }

    /// 执行非终止工具，执行记录追加到 decision_log 并写入共享记忆
    async fn tool_step(
        &self,
        state: &mut ConversationState,
        decision: AgentDecision,
    ) -> Result<(), AgentError> {
        self.progress.report(&ProgressEvent::ToolCall {
            tool: decision.tool_name.clone(),
            args: serde_json::Value::Object(decision.tool_input.clone()),
        });
        let output = self
            .executor
            .execute(&decision.tool_name, &decision.tool_input)
            .await?;
        self.progress.report(&ProgressEvent::Observation {
            tool: decision.tool_name.clone(),
            preview: preview(&output),
        });
        let executed = decision.executed(output);
        self.memory
            .record(std::slice::from_ref(&executed), &state.user_query);
        state.push_decision(executed);
        Ok(())
    }

    async fn final_step(
        &self,
        state: &mut ConversationState,
        decision: AgentDecision,
    ) -> Result<(), AgentError> {
        let text = self
            .executor
            .execute(&decision.tool_name, &decision.tool_input)
            .await?;
        tracing::debug!(agent = ?state.active_agent, "final answer produced");
        let executed = decision.executed(text);
        state.final_output = Some(executed.clone());
        state.push_decision(executed);
        Ok(())
    }

    /// 上限兜底：保留 Primary 已有答案，否则使用固定文本
    fn forced_final_step(&self, state: &mut ConversationState) {
        let text = state
            .final_text()
            .map(str::to_string)
            .unwrap_or_else(|| ITERATION_LIMIT_ANSWER.to_string());
        tracing::warn!(
            agent_turns = state.agent_turns,
            max_agent_turns = self.max_agent_turns,
            kept_primary_answer = state.final_output.is_some(),
            "iteration limit reached, forcing final answer"
        );
        self.progress.report(&ProgressEvent::IterationLimit {
            turns: state.agent_turns,
        });
        state.final_output = Some(AgentDecision::final_answer(text.clone()).executed(text));
        state.iteration_limit_hit = true;
    }
}

fn human_prompt(state: &ConversationState) -> String {
    format!(
        "The primary agent answered:\n\n{}\n\nRun the secondary agent to enrich this answer? (yes/no)",
        state.final_text().unwrap_or_default()
    )
}
