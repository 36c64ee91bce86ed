//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / invoke），由 ToolRegistry 按名注册与查找，
//! ToolExecutor 在调用时加超时并统一转 AgentError。图构建时用 require 校验引用到的工具名，缺失即失败。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::AgentError;

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步调用（参数为 JSON 对象）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（对应决策中的 "name" 字段）
    fn name(&self) -> &str;

    /// 工具描述（展示给模型，用于选择工具）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；参数名大小写敏感
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn invoke(&self, args: &Map<String, Value>) -> Result<String, String>;
}

/// 取必填字符串参数；缺失或为空时返回错误信息
pub fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing `{key}` parameter"))
}

/// 只含一个字符串参数的 schema
pub fn single_string_schema(key: &str, description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": { key: { "type": "string", "description": description } },
        "required": [key]
    })
}

/// 工具注册表：按名称有序存储 Arc<dyn Tool>，提示词中的工具列表因此稳定
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "tool registered twice, keeping the latest");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// 校验给定工具名均已注册（启动时 fail fast）
    pub fn require(&self, names: &[&str]) -> Result<(), AgentError> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| !self.contains(n))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AgentError::Config(format!(
                "tools referenced by the graph are not registered: {}",
                missing.join(", ")
            )))
        }
    }

    /// 提示词中的工具目录：`1. \`name\`: description`
    pub fn catalogue(&self) -> String {
        self.tools
            .values()
            .enumerate()
            .map(|(i, tool)| format!("{}. `{}`: {}", i + 1, tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 每个工具的参数 schema，一行一个：`` `name`: {...} ``；模型据此拼出大小写一致的参数名
    pub fn parameter_schemas(&self) -> String {
        self.tools
            .iter()
            .map(|(name, tool)| format!("`{}`: {}", name, tool.parameters_schema()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FinalAnswerTool;

    #[test]
    fn test_require_reports_missing_names() {
        let mut reg = ToolRegistry::new();
        reg.register(FinalAnswerTool);
        assert!(reg.require(&["final_answer"]).is_ok());
        let err = reg.require(&["final_answer", "tool_wikipedia"]).unwrap_err();
        assert!(err.to_string().contains("tool_wikipedia"));
    }

    #[test]
    fn test_catalogue_is_numbered() {
        let mut reg = ToolRegistry::new();
        reg.register(FinalAnswerTool);
        let cat = reg.catalogue();
        assert!(cat.starts_with("1. `final_answer`: "));
    }

    #[test]
    fn test_parameter_schemas_list_each_tool() {
        let mut reg = ToolRegistry::new();
        reg.register(FinalAnswerTool);
        let schemas = reg.parameter_schemas();
        let (name, schema) = schemas.split_once(": ").unwrap();
        assert_eq!(name, "`final_answer`");
        let v: Value = serde_json::from_str(schema).unwrap();
        assert_eq!(v["required"][0], "text");
        assert_eq!(v["properties"]["text"]["type"], "string");
    }

    #[test]
    fn test_required_str() {
        let mut args = Map::new();
        args.insert("query".into(), Value::String("  rust  ".into()));
        args.insert("blank".into(), Value::String(" ".into()));
        assert_eq!(required_str(&args, "query").unwrap(), "rust");
        assert!(required_str(&args, "blank").is_err());
        assert!(required_str(&args, "Query").is_err());
    }
}
