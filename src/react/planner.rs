//! Planner：为 Primary / Secondary 智能体拼装消息、调用模型并解析决策
//!
//! 消息顺序：system（角色提示词 + 工具目录 + 决策 Schema）→ chat_history → 记忆上下文
//! → 原始问题提醒（仅当记忆上下文非空）→ 本轮用户消息。
//! Secondary 的用户消息是 Primary 的最终答案文本。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::core::{AgentDecision, AgentError, AgentRole, ConversationState};
use crate::llm::{LlmClient, ResponseFormat};
use crate::memory::{MemoryStore, Message};
use crate::react::parse_decision;
use crate::tools::{decision_schema_json, ToolRegistry};

pub const DEFAULT_PRIMARY_PROMPT: &str = r#"You know everything, you must answer every question from the user, you can use the list of tools provided to you.
Your goal is to provide the user with the best possible answer, including key information about the sources and tools used.

Note, when using a tool, you provide the tool name and the arguments to use in JSON format.
For each call, you MUST ONLY use one tool AND the response format must ALWAYS be in the pattern:
{"name":"<tool_name>", "parameters": {"<tool_input_key>":<tool_input_value>}}

Remember, do NOT use any tool with the same query more than once.
Remember, if the user doesn't ask a specific question, you MUST use the `final_answer` tool directly.
Remember, parameters are case-sensitive, and must be written exactly as in the tool description.

When answering:
1. If you are very confident about the answer, provide a direct and complete response
2. If you are uncertain or need more information, indicate that in your response
3. Be explicit about any limitations or uncertainties in your answer"#;

pub const DEFAULT_SECONDARY_PROMPT: &str = r#"Your goal is to use the `{enrichment_tool}` ONLY ONCE to enrich the information already available.
Note, when using a tool, you provide the tool name and the arguments to use in JSON format.
For each call, you MUST ONLY use one tool AND the response format must ALWAYS be in the json response pattern given below:

{"name":"<tool_name>", "parameters": {"<tool_input_key>":<tool_input_value>}}

First you must use the `{enrichment_tool}`, then elaborate the information to answer the user's question with `final_answer` tool."#;

/// 记忆上下文之后追加的提醒，防止模型偏离原始问题
pub fn query_reminder(user_query: &str) -> String {
    format!(
        "This is just a reminder that my original query was `{}`.\n\
         Only answer to the original query, and nothing else, but use the information I gave you.\n\
         Provide as much information as possible when you use the `final_answer` tool.",
        user_query
    )
}

/// 两个智能体的角色提示词；`{enrichment_tool}` 占位符在加载时替换
#[derive(Debug, Clone)]
pub struct AgentPrompts {
    pub primary: String,
    pub secondary: String,
}

impl AgentPrompts {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>, enrichment_tool: &str) -> Self {
        Self {
            primary: primary.into().replace("{enrichment_tool}", enrichment_tool),
            secondary: secondary.into().replace("{enrichment_tool}", enrichment_tool),
        }
    }

    pub fn builtin(enrichment_tool: &str) -> Self {
        Self::new(DEFAULT_PRIMARY_PROMPT, DEFAULT_SECONDARY_PROMPT, enrichment_tool)
    }

    /// 从目录读取 primary.md / secondary.md；文件缺失或为空时用内置提示词
    pub fn load(dir: &Path, enrichment_tool: &str) -> Self {
        let read = |file: &str, fallback: &str| -> String {
            let path = dir.join(file);
            match std::fs::read_to_string(&path) {
                Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
                Ok(_) => fallback.to_string(),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "prompt file not loaded, using builtin");
                    fallback.to_string()
                }
            }
        };
        Self::new(
            read("primary.md", DEFAULT_PRIMARY_PROMPT),
            read("secondary.md", DEFAULT_SECONDARY_PROMPT),
            enrichment_tool,
        )
    }

    pub fn for_role(&self, role: AgentRole) -> &str {
        match role {
            AgentRole::Primary => &self.primary,
            AgentRole::Secondary => &self.secondary,
        }
    }
}

/// Planner：持有 LLM、工具注册表（目录与校验）、共享记忆与提示词
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    registry: ToolRegistry,
    memory: Arc<MemoryStore>,
    prompts: AgentPrompts,
    request_timeout: Duration,
}

impl Planner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        registry: ToolRegistry,
        memory: Arc<MemoryStore>,
        prompts: AgentPrompts,
        request_timeout_secs: u64,
    ) -> Self {
        Self {
            llm,
            registry,
            memory,
            prompts,
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    fn system_prompt(&self, role: AgentRole) -> String {
        format!(
            "{}\n\nYou can use the following tools:\n{}\n\nParameters of each tool (keys are case-sensitive):\n{}\n\nAlways reply with one JSON object matching this schema:\n{}",
            self.prompts.for_role(role),
            self.registry.catalogue(),
            self.registry.parameter_schemas(),
            decision_schema_json()
        )
    }

    /// 拼装一次模型调用的完整消息列表
    pub fn build_messages(&self, role: AgentRole, state: &ConversationState) -> Vec<Message> {
        let mut messages = vec![Message::system(self.system_prompt(role))];
        messages.extend(state.chat_history.iter().cloned());

        let context = self.memory.relevant_context(&state.user_query);
        if !context.is_empty() {
            messages.extend(context);
            messages.push(Message::user(query_reminder(&state.user_query)));
        }

        let user = match role {
            AgentRole::Primary => state.user_query.clone(),
            AgentRole::Secondary => state
                .final_text()
                .map(str::to_string)
                .unwrap_or_else(|| state.user_query.clone()),
        };
        messages.push(Message::user(user));
        messages
    }

    /// 一次模型调用：超时 → LlmTimeout，后端错误 → Llm，解析失败 → DecisionParse
    pub async fn decide(
        &self,
        role: AgentRole,
        state: &ConversationState,
    ) -> Result<AgentDecision, AgentError> {
        let messages = self.build_messages(role, state);
        tracing::debug!(?role, messages = messages.len(), model = %self.llm.model(), "calling LLM");

        let raw = timeout(
            self.request_timeout,
            self.llm.complete(&messages, ResponseFormat::Json),
        )
        .await
        .map_err(|_| AgentError::LlmTimeout(self.request_timeout.as_secs()))??;

        let decision = parse_decision(&raw, &self.registry).map_err(|e| {
            tracing::warn!(?role, error = %e, "could not parse agent decision");
            e
        })?;
        tracing::info!(?role, tool = %decision.tool_name, "agent decided");
        Ok(decision)
    }
}
