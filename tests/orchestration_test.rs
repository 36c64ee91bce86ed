//! 编排图集成测试：脚本化 LLM + 桩工具，覆盖路由、补充检索策略、迭代上限与人工检查点

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use duet::core::{AgentError, DecisionError, HumanChoice, RunOutcome};
    use duet::llm::{LlmClient, LlmError, ResponseFormat, ScriptedLlmClient};
    use duet::memory::{MemoryLimits, MemoryStore, Message};
    use duet::react::{NoopProgress, ProgressEvent, ProgressSink, FALLBACK_APOLOGY};
    use duet::tools::{FinalAnswerTool, Tool, ToolRegistry};
    use duet::workflow::{EnrichmentPolicy, GraphBuilder, OrchestrationGraph, ITERATION_LIMIT_ANSWER};
    use serde_json::{Map, Value};

    struct StubTool {
        name: &'static str,
        output: Result<String, String>,
        calls: AtomicUsize,
    }

    impl StubTool {
        fn ok(name: &'static str, output: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                output: Ok(output.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str, message: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                output: Err(message.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "stub"
        }

        async fn invoke(&self, _args: &Map<String, Value>) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.output.clone()
        }
    }

    /// 同步回答人工检查点的进度输出
    struct AutoHuman(HumanChoice);

    #[async_trait]
    impl ProgressSink for AutoHuman {
        fn report(&self, _event: &ProgressEvent) {}

        async fn ask_human(&self, _prompt: &str) -> Option<HumanChoice> {
            Some(self.0)
        }
    }

    struct Fixture {
        llm: Arc<ScriptedLlmClient>,
        browser: Arc<StubTool>,
        wikipedia: Arc<StubTool>,
        memory: Arc<MemoryStore>,
    }

    impl Fixture {
        fn new<I, S>(responses: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self::with_browser(responses, StubTool::ok("tool_browser", "Paris is the capital and largest city of France."))
        }

        fn with_browser<I, S>(responses: I, browser: Arc<StubTool>) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                llm: Arc::new(ScriptedLlmClient::new(responses)),
                browser,
                wikipedia: StubTool::ok("tool_wikipedia", "Paris: capital of France since 987."),
                memory: Arc::new(MemoryStore::new(MemoryLimits::default())),
            }
        }

        fn builder(&self) -> GraphBuilder {
            let mut registry = ToolRegistry::new();
            registry.register(FinalAnswerTool);
            registry.register_arc(self.browser.clone());
            registry.register_arc(self.wikipedia.clone());
            GraphBuilder::new(self.llm.clone(), registry)
                .memory(self.memory.clone())
                .progress(Arc::new(NoopProgress))
        }

        fn graph(&self, policy: EnrichmentPolicy) -> OrchestrationGraph {
            self.builder().policy(policy).build().unwrap()
        }
    }

    fn call(name: &str, key: &str, value: &str) -> String {
        serde_json::json!({ "name": name, "parameters": { key: value } }).to_string()
    }

    fn final_answer(text: &str) -> String {
        call("final_answer", "text", text)
    }

    fn completed(outcome: RunOutcome) -> String {
        match outcome {
            RunOutcome::Completed(text) => text,
            RunOutcome::Paused(p) => panic!("unexpected pause: {}", p.prompt),
        }
    }

    #[tokio::test]
    async fn test_search_then_answer() {
        let fx = Fixture::new([
            call("tool_browser", "query", "capital of France"),
            final_answer("The capital of France is Paris."),
        ]);
        let graph = fx.graph(EnrichmentPolicy::Heuristic);

        let answer = completed(graph.run("What is the capital of France?", vec![]).await.unwrap());
        assert_eq!(answer, "The capital of France is Paris.");
        assert_eq!(fx.llm.calls(), 2);
        assert_eq!(fx.browser.calls(), 1);
        assert_eq!(fx.wikipedia.calls(), 0);

        let records = fx.memory.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tool, "tool_browser");
        assert_eq!(records[0].query, "What is the capital of France?");

        // 第二次调用能看到工具输出与原始问题提醒
        let second = &fx.llm.seen_messages()[1];
        assert!(second
            .iter()
            .any(|m| m.content == "Paris is the capital and largest city of France."));
        assert!(second
            .iter()
            .any(|m| m.content.contains("my original query was `What is the capital of France?`")));
    }

    #[tokio::test]
    async fn test_greeting_answers_directly() {
        let fx = Fixture::new([final_answer("Hello! How can I help you today?")]);
        let graph = fx.graph(EnrichmentPolicy::Heuristic);

        let answer = completed(graph.run("hello", vec![]).await.unwrap());
        assert_eq!(answer, "Hello! How can I help you today?");
        assert_eq!(fx.llm.calls(), 1);
        assert_eq!(fx.browser.calls() + fx.wikipedia.calls(), 0);
        assert!(fx.memory.is_empty());
    }

    #[tokio::test]
    async fn test_empty_object_yields_apology() {
        let fx = Fixture::new(["{}"]);
        let graph = fx.graph(EnrichmentPolicy::Heuristic);

        let answer = completed(graph.run("???", vec![]).await.unwrap());
        assert_eq!(answer, FALLBACK_APOLOGY);
        assert_eq!(fx.llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_cap_of_three_forces_fallback() {
        let fx = Fixture::new([call("tool_browser", "query", "loop")]);
        let graph = fx.builder().max_agent_turns(3).build().unwrap();

        let answer = completed(graph.run("loop forever", vec![]).await.unwrap());
        assert_eq!(answer, ITERATION_LIMIT_ANSWER);
        assert_eq!(fx.llm.calls(), 3);
        assert_eq!(fx.browser.calls(), 3);
    }

    #[tokio::test]
    async fn test_default_cap_terminates_repeating_model() {
        let fx = Fixture::new([call("tool_browser", "query", "again")]);
        let graph = fx.graph(EnrichmentPolicy::Always);

        let answer = completed(graph.run("never ends", vec![]).await.unwrap());
        assert_eq!(answer, ITERATION_LIMIT_ANSWER);
        assert_eq!(fx.llm.calls(), graph.max_agent_turns());
    }

    #[tokio::test]
    async fn test_uncertain_answer_goes_through_secondary() {
        let fx = Fixture::new([
            final_answer("It might be Lyon."),
            call("tool_wikipedia", "query", "France"),
            final_answer("The capital of France is Paris."),
        ]);
        let graph = fx.graph(EnrichmentPolicy::Heuristic);

        let answer = completed(graph.run("capital of France?", vec![]).await.unwrap());
        assert_eq!(answer, "The capital of France is Paris.");
        assert_eq!(fx.llm.calls(), 3);
        assert_eq!(fx.wikipedia.calls(), 1);

        // Secondary 的用户消息是 Primary 的答案
        let secondary = &fx.llm.seen_messages()[1];
        assert_eq!(secondary.last(), Some(&Message::user("It might be Lyon.")));
        assert!(secondary[0].content.contains("`tool_wikipedia` ONLY ONCE"));
    }

    #[tokio::test]
    async fn test_secondary_cut_short_keeps_primary_answer() {
        let fx = Fixture::new([
            final_answer("Paris."),
            call("tool_wikipedia", "query", "Paris"),
            final_answer("never reached"),
        ]);
        let graph = fx
            .builder()
            .policy(EnrichmentPolicy::Always)
            .max_agent_turns(2)
            .build()
            .unwrap();

        let answer = completed(graph.run("capital of France?", vec![]).await.unwrap());
        assert_eq!(answer, "Paris.");
        assert_eq!(fx.llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_human_policy_pauses_and_resumes() {
        let fx = Fixture::new([
            final_answer("Paris."),
            call("tool_wikipedia", "query", "Paris"),
            final_answer("Paris, capital since 987."),
        ]);
        let graph = fx.graph(EnrichmentPolicy::Human);

        let paused = match graph.run("capital of France?", vec![]).await.unwrap() {
            RunOutcome::Paused(p) => p,
            RunOutcome::Completed(text) => panic!("expected pause, got {text}"),
        };
        assert!(paused.prompt.contains("Paris."));
        assert_eq!(fx.llm.calls(), 1);

        let err = graph.resume(paused.clone(), "maybe").await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidHumanChoice(c) if c == "maybe"));

        let ended = completed(graph.resume(paused.clone(), "END").await.unwrap());
        assert_eq!(ended, "Paris.");
        assert_eq!(fx.llm.calls(), 1);

        let enriched = completed(graph.resume(paused, "yes").await.unwrap());
        assert_eq!(enriched, "Paris, capital since 987.");
        assert_eq!(fx.wikipedia.calls(), 1);
    }

    #[tokio::test]
    async fn test_decision_log_after_search_then_answer() {
        let fx = Fixture::new([
            call("tool_browser", "query", "capital of France"),
            final_answer("The capital of France is Paris."),
        ]);
        let graph = fx.graph(EnrichmentPolicy::Heuristic);

        let (outcome, state) = graph
            .run_with_state("What is the capital of France?", vec![])
            .await
            .unwrap();
        assert_eq!(completed(outcome), "The capital of France is Paris.");

        let log: Vec<(&str, Option<&str>)> = state
            .decision_log
            .iter()
            .map(|d| (d.tool_name.as_str(), d.tool_output.as_deref()))
            .collect();
        assert_eq!(
            log,
            vec![
                ("tool_browser", None),
                ("tool_browser", Some("Paris is the capital and largest city of France.")),
                ("final_answer", None),
                ("final_answer", Some("The capital of France is Paris.")),
            ]
        );
        assert_eq!(state.decision_log[0].tool_input["query"], "capital of France");
        assert_eq!(state.tool_calls(), 1);
        assert_eq!(state.last_decision(), state.final_output.as_ref());
    }

    #[tokio::test]
    async fn test_decision_log_after_direct_answer() {
        let fx = Fixture::new([final_answer("Hello! How can I help you today?")]);
        let graph = fx.graph(EnrichmentPolicy::Heuristic);

        let (_, state) = graph.run_with_state("hello", vec![]).await.unwrap();
        assert_eq!(state.decision_log.len(), 2);
        assert!(state.decision_log.iter().all(|d| d.is_final()));
        assert_eq!(state.tool_calls(), 0);
        assert_eq!(state.answers(), vec!["Hello! How can I help you today?"]);
    }

    #[tokio::test]
    async fn test_paused_state_carries_primary_decision() {
        let fx = Fixture::new([final_answer("Paris."), final_answer("Paris, France.")]);
        let graph = fx.graph(EnrichmentPolicy::Human);

        let RunOutcome::Paused(paused) = graph.run("capital?", vec![]).await.unwrap() else {
            panic!("expected pause");
        };
        assert_eq!(paused.state.agent_turns, 1);
        assert_eq!(paused.state.decision_log.len(), 2);
        let last = paused.state.last_decision().unwrap();
        assert!(last.is_final());
        assert_eq!(last.tool_output.as_deref(), Some("Paris."));

        // 补充后两个答案都保留在日志中，final_output 指向 Secondary 的答案
        let (outcome, state) = graph.resume_with_state(paused, "yes").await.unwrap();
        assert_eq!(completed(outcome), "Paris, France.");
        assert_eq!(state.answers(), vec!["Paris.", "Paris, France."]);
        assert_eq!(state.final_text(), Some("Paris, France."));
    }

    #[tokio::test]
    async fn test_empty_final_answer_is_returned_unchanged() {
        let fx = Fixture::new([final_answer("")]);
        let graph = fx.graph(EnrichmentPolicy::Heuristic);

        let answer = completed(graph.run("say nothing", vec![]).await.unwrap());
        assert_eq!(answer, "");
        assert_eq!(fx.llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_paused_state_survives_serialization() {
        let fx = Fixture::new([final_answer("Paris."), final_answer("Paris, France.")]);
        let graph = fx.graph(EnrichmentPolicy::Human);

        let RunOutcome::Paused(paused) = graph.run("capital?", vec![]).await.unwrap() else {
            panic!("expected pause");
        };
        let json = serde_json::to_string(&paused).unwrap();
        let restored = serde_json::from_str(&json).unwrap();
        let answer = completed(graph.resume(restored, "continue").await.unwrap());
        assert_eq!(answer, "Paris, France.");
    }

    #[tokio::test]
    async fn test_human_sink_answers_synchronously() {
        let fx = Fixture::new([final_answer("Paris."), final_answer("Paris, France.")]);
        let graph = fx
            .builder()
            .policy(EnrichmentPolicy::Human)
            .progress(Arc::new(AutoHuman(HumanChoice::Continue)))
            .build()
            .unwrap();

        let answer = completed(graph.run("capital?", vec![]).await.unwrap());
        assert_eq!(answer, "Paris, France.");
    }

    #[tokio::test]
    async fn test_tool_failure_propagates() {
        let fx = Fixture::with_browser(
            [call("tool_browser", "query", "x")],
            StubTool::failing("tool_browser", "network unreachable"),
        );
        let graph = fx.graph(EnrichmentPolicy::Heuristic);

        let err = graph.run("x", vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::ToolExecution { ref tool, ref message }
                if tool == "tool_browser" && message == "network unreachable"
        ));
        assert_eq!(fx.llm.calls(), 1);
        assert!(fx.memory.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_propagates() {
        let fx = Fixture::new([call("tool_shell", "cmd", "ls")]);
        let graph = fx.graph(EnrichmentPolicy::Heuristic);

        let err = graph.run("list files", vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::DecisionParse(DecisionError::UnknownTool(ref name)) if name == "tool_shell"
        ));
    }

    #[tokio::test]
    async fn test_progress_events_are_reported() {
        let fx = Fixture::new([
            call("tool_browser", "query", "capital of France"),
            final_answer("Paris."),
        ]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let graph = fx.builder().progress(Arc::new(tx)).build().unwrap();
        graph.run("capital of France?", vec![]).await.unwrap();
        drop(graph);

        let mut steps = Vec::new();
        while let Some(event) = rx.recv().await {
            steps.push(event.to_string());
        }
        assert_eq!(steps.first().map(String::as_str), Some("Agent thinking..."));
        assert!(steps.contains(&"Moving to tool_browser...".to_string()));
        assert!(steps.contains(&"Using tool_browser...".to_string()));
        assert!(steps.contains(&"Moving to final_answer...".to_string()));
        assert_eq!(steps.last().map(String::as_str), Some("Done"));
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmClient for SlowLlm {
        async fn complete(
            &self,
            _messages: &[Message],
            _format: ResponseFormat,
        ) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("{}".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_llm_timeout_is_fatal() {
        let mut registry = ToolRegistry::new();
        registry.register(FinalAnswerTool);
        registry.register_arc(StubTool::ok("tool_wikipedia", "-"));
        let graph = GraphBuilder::new(Arc::new(SlowLlm), registry)
            .llm_timeout_secs(5)
            .build()
            .unwrap();

        let err = graph.run("slow", vec![]).await.unwrap_err();
        assert!(matches!(err, AgentError::LlmTimeout(5)));
    }

    #[tokio::test]
    async fn test_chat_history_is_forwarded() {
        let fx = Fixture::new([final_answer("Yes, Paris.")]);
        let graph = fx.graph(EnrichmentPolicy::Heuristic);
        let history = vec![
            Message::user("What is the capital of France?"),
            Message::assistant("Paris."),
        ];

        graph.run("Are you sure?", history.clone()).await.unwrap();
        let seen = &fx.llm.seen_messages()[0];
        assert_eq!(&seen[1..3], history.as_slice());
    }
}
