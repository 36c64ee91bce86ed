//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时，execute(decision) 在超时内调用对应工具，
//! 超时或失败时转为 AgentError（ToolTimeout / ToolExecution）；每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::time::timeout;

use crate::core::{AgentError, DecisionError};
use crate::tools::ToolRegistry;

/// 工具执行器：对每次调用施加超时，并将结果映射为 AgentError
#[derive(Clone)]
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行指定工具；未注册返回 UnknownTool，超时返回 ToolTimeout，工具返回 Err 则转为 ToolExecution
    pub async fn execute(
        &self,
        tool_name: &str,
        args: &Map<String, Value>,
    ) -> Result<String, AgentError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| DecisionError::UnknownTool(tool_name.to_string()))?;

        let start = Instant::now();
        let result = timeout(self.timeout, tool.invoke(args)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(args),
        });
        tracing::info!(audit = %audit, "tool");

        match result {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(message)) => Err(AgentError::ToolExecution {
                tool: tool_name.to_string(),
                message,
            }),
            Err(_) => Err(AgentError::ToolTimeout(tool_name.to_string())),
        }
    }
}

fn args_preview(args: &Map<String, Value>) -> String {
    let s = Value::Object(args.clone()).to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use async_trait::async_trait;

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "sleeps"
        }

        async fn invoke(&self, _args: &Map<String, Value>) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".into())
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn invoke(&self, _args: &Map<String, Value>) -> Result<String, String> {
            Err("upstream 503".into())
        }
    }

    fn executor(timeout_secs: u64) -> ToolExecutor {
        let mut reg = ToolRegistry::new();
        reg.register(SlowTool);
        reg.register(BrokenTool);
        ToolExecutor::new(reg, timeout_secs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_tool_timeout() {
        let err = executor(1).execute("slow", &Map::new()).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolTimeout(name) if name == "slow"));
    }

    #[tokio::test]
    async fn test_failure_maps_to_tool_execution() {
        let err = executor(5).execute("broken", &Map::new()).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::ToolExecution { ref tool, ref message } if tool == "broken" && message == "upstream 503"
        ));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_decision_error() {
        let err = executor(5).execute("nope", &Map::new()).await.unwrap_err();
        assert!(err.is_decision_error());
    }
}
