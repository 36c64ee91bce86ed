//! 编排图构建器
//!
//! 提供流畅的 API 组装 OrchestrationGraph；build() 时校验引用到的工具与迭代上限，失败即 Config 错误。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AgentError, FINAL_ANSWER_TOOL};
use crate::llm::LlmClient;
use crate::memory::{MemoryLimits, MemoryStore};
use crate::react::{AgentPrompts, NoopProgress, Planner, ProgressSink};
use crate::tools::{ToolExecutor, ToolRegistry, WIKIPEDIA_TOOL};
use crate::workflow::{EnrichmentPolicy, OrchestrationGraph, UncertaintyHeuristic};

pub struct GraphBuilder {
    llm: Arc<dyn LlmClient>,
    registry: ToolRegistry,
    memory: Option<Arc<MemoryStore>>,
    prompts: Option<AgentPrompts>,
    policy: EnrichmentPolicy,
    heuristic: UncertaintyHeuristic,
    enrichment_tool: String,
    max_agent_turns: usize,
    llm_timeout_secs: u64,
    tool_timeout_secs: u64,
    progress: Arc<dyn ProgressSink>,
}

impl GraphBuilder {
    pub fn new(llm: Arc<dyn LlmClient>, registry: ToolRegistry) -> Self {
        Self {
            llm,
            registry,
            memory: None,
            prompts: None,
            policy: EnrichmentPolicy::default(),
            heuristic: UncertaintyHeuristic::default(),
            enrichment_tool: WIKIPEDIA_TOOL.to_string(),
            max_agent_turns: 8,
            llm_timeout_secs: 120,
            tool_timeout_secs: 30,
            progress: Arc::new(NoopProgress),
        }
    }

    /// 按配置设置策略、上限、超时与提示词（提示词从 prompts_dir 读取）
    pub fn with_config(self, cfg: &AppConfig) -> Self {
        let prompts = AgentPrompts::load(&cfg.agent.prompts_dir, &cfg.agent.enrichment_tool);
        self.policy(cfg.agent.enrichment)
            .heuristic(UncertaintyHeuristic::new(&cfg.agent.uncertainty_markers))
            .enrichment_tool(cfg.agent.enrichment_tool.clone())
            .max_agent_turns(cfg.agent.max_agent_turns)
            .llm_timeout_secs(cfg.llm.timeouts.request)
            .tool_timeout_secs(cfg.tools.tool_timeout_secs)
            .prompts(prompts)
    }

    pub fn memory(mut self, memory: Arc<MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn prompts(mut self, prompts: AgentPrompts) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn policy(mut self, policy: EnrichmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn heuristic(mut self, heuristic: UncertaintyHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn enrichment_tool(mut self, name: impl Into<String>) -> Self {
        self.enrichment_tool = name.into();
        self
    }

    pub fn max_agent_turns(mut self, n: usize) -> Self {
        self.max_agent_turns = n;
        self
    }

    pub fn llm_timeout_secs(mut self, secs: u64) -> Self {
        self.llm_timeout_secs = secs;
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.tool_timeout_secs = secs;
        self
    }

    pub fn progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn build(self) -> Result<OrchestrationGraph, AgentError> {
        self.registry
            .require(&[FINAL_ANSWER_TOOL, self.enrichment_tool.as_str()])?;
        if self.max_agent_turns == 0 {
            return Err(AgentError::Config(
                "agent.max_agent_turns must be at least 1".to_string(),
            ));
        }

        let memory = self
            .memory
            .unwrap_or_else(|| Arc::new(MemoryStore::new(MemoryLimits::default())));
        let prompts = self
            .prompts
            .unwrap_or_else(|| AgentPrompts::builtin(&self.enrichment_tool));
        let planner = Planner::new(
            self.llm,
            self.registry.clone(),
            Arc::clone(&memory),
            prompts,
            self.llm_timeout_secs,
        );
        tracing::debug!(
            tools = ?self.registry.tool_names(),
            max_agent_turns = self.max_agent_turns,
            policy = ?self.policy,
            "orchestration graph built"
        );
        Ok(OrchestrationGraph {
            planner,
            executor: ToolExecutor::new(self.registry, self.tool_timeout_secs),
            memory,
            policy: self.policy,
            heuristic: self.heuristic,
            max_agent_turns: self.max_agent_turns,
            progress: self.progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::tools::FinalAnswerTool;

    #[test]
    fn test_build_requires_final_answer_and_enrichment_tool() {
        let mut reg = ToolRegistry::new();
        reg.register(FinalAnswerTool);
        let err = GraphBuilder::new(Arc::new(MockLlmClient), reg.clone())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Config(msg) if msg.contains("tool_wikipedia")));

        let ok = GraphBuilder::new(Arc::new(MockLlmClient), reg)
            .enrichment_tool("final_answer")
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_build_rejects_zero_turns() {
        let mut reg = ToolRegistry::new();
        reg.register(FinalAnswerTool);
        let err = GraphBuilder::new(Arc::new(MockLlmClient), reg)
            .enrichment_tool("final_answer")
            .max_agent_turns(0)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
