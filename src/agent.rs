//! Headless 助手运行时
//!
//! 供 CLI 或其他前端调用：Assistant::from_config 组装 LLM、工具、共享记忆与编排图；
//! answer 对单个问题跑完整个图，失败时降级为一句说明而不是把错误抛给用户。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AgentError, PausedState, RunOutcome};
use crate::llm::{create_llm_from_config, LlmClient};
use crate::memory::{MemoryStore, Message};
use crate::react::{LogProgress, ProgressSink};
use crate::tools::create_default_registry;
use crate::workflow::{GraphBuilder, OrchestrationGraph};

/// 致命错误时展示给用户的文本
pub fn degraded_answer(err: &AgentError) -> String {
    format!("Sorry, I could not produce a response. ({})", err)
}

pub struct Assistant {
    graph: OrchestrationGraph,
    memory: Arc<MemoryStore>,
}

impl Assistant {
    /// 按配置创建（使用 tracing 输出进度）
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AgentError> {
        Self::from_config_with(cfg, Arc::new(LogProgress))
    }

    pub fn from_config_with(
        cfg: &AppConfig,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Self, AgentError> {
        let llm = create_llm_from_config(&cfg.llm)?;
        Self::with_llm(cfg, llm, progress)
    }

    /// 使用外部提供的 LLM（测试或自定义后端）
    pub fn with_llm(
        cfg: &AppConfig,
        llm: Arc<dyn LlmClient>,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Self, AgentError> {
        let limits = cfg.memory.limits();
        let memory = Arc::new(match &cfg.memory.persist_path {
            Some(path) => MemoryStore::restore(limits, path),
            None => MemoryStore::new(limits),
        });
        let graph = GraphBuilder::new(llm, create_default_registry(&cfg.tools))
            .with_config(cfg)
            .memory(Arc::clone(&memory))
            .progress(progress)
            .build()?;
        Ok(Self { graph, memory })
    }

    pub fn graph(&self) -> &OrchestrationGraph {
        &self.graph
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub async fn run(
        &self,
        query: &str,
        history: Vec<Message>,
    ) -> Result<RunOutcome, AgentError> {
        self.graph.run(query, history).await
    }

    pub async fn resume(
        &self,
        paused: PausedState,
        choice: &str,
    ) -> Result<RunOutcome, AgentError> {
        self.graph.resume(paused, choice).await
    }

    /// 跑一次问题，错误降级为说明文本；暂停时原样返回 Paused
    pub async fn answer(&self, query: &str, history: Vec<Message>) -> RunOutcome {
        match self.graph.run(query, history).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "run failed");
                RunOutcome::Completed(degraded_answer(&e))
            }
        }
    }

    /// 尽力保存记忆；失败只记日志
    pub fn persist_memory(&self) {
        if let Err(e) = self.memory.persist() {
            tracing::warn!(error = %e, "failed to persist memory");
        }
    }
}
