//! 终止型工具：原样返回 text 参数

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::FINAL_ANSWER_TOOL;
use crate::tools::registry::single_string_schema;
use crate::tools::Tool;

pub struct FinalAnswerTool;

#[async_trait]
impl Tool for FinalAnswerTool {
    fn name(&self) -> &str {
        FINAL_ANSWER_TOOL
    }

    fn description(&self) -> &str {
        "Return the final answer to the user. Args: {\"text\": \"...\"}."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("text", "the complete answer shown to the user")
    }

    async fn invoke(&self, args: &Map<String, Value>) -> Result<String, String> {
        // 不 trim、不拒绝空串：保留模型给出的原样文本
        args.get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "Missing `text` parameter".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_text_verbatim() {
        let mut args = Map::new();
        args.insert("text".into(), Value::String("  Paris.\n".into()));
        assert_eq!(FinalAnswerTool.invoke(&args).await.unwrap(), "  Paris.\n");
    }

    #[tokio::test]
    async fn test_empty_and_blank_text_pass_through() {
        for text in ["", "   ", "\n"] {
            let mut args = Map::new();
            args.insert("text".into(), Value::String(text.into()));
            assert_eq!(FinalAnswerTool.invoke(&args).await.unwrap(), text);
        }
    }

    #[tokio::test]
    async fn test_missing_text_is_error() {
        let err = FinalAnswerTool.invoke(&Map::new()).await.unwrap_err();
        assert!(err.contains("text"));
    }

    #[tokio::test]
    async fn test_non_string_text_is_error() {
        let mut args = Map::new();
        args.insert("text".into(), serde_json::json!(42));
        assert!(FinalAnswerTool.invoke(&args).await.is_err());
    }
}
