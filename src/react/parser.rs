//! 模型输出解析：原始文本 → AgentDecision
//!
//! 解析顺序：原文 → 去掉 ``` 围栏（及语言标记）→ 截取第一个 `{` 到最后一个 `}`。
//! 空对象 `{}` 视为模型放弃作答，转为带致歉文本的 final_answer，而不是错误。

use serde_json::{Map, Value};

use crate::core::{AgentDecision, DecisionError};
use crate::tools::ToolRegistry;

/// 模型返回 `{}` 时给用户的致歉文本
pub const FALLBACK_APOLOGY: &str =
    "I apologize, but I couldn't generate a proper response. Please try rephrasing your question.";

/// 去掉包裹整段内容的 ``` 围栏与紧随其后的语言标记（如 ```json）
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// 截取第一个 `{` 到最后一个 `}`，用于模型在 JSON 前后附带说明文字的情况
fn extract_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_json(raw: &str) -> Result<Value, serde_json::Error> {
    let stripped = strip_fences(raw);
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(v) => Ok(v),
        Err(first) => serde_json::from_str::<Value>(stripped).or_else(|_| {
            extract_braces(raw)
                .map(|s| serde_json::from_str::<Value>(s))
                .unwrap_or(Err(first))
        }),
    }
}

fn is_empty_object(v: &Value) -> bool {
    v.as_object().is_some_and(Map::is_empty)
}

/// 将一次模型输出解析为待执行的决策
///
/// - 空白输出 → `EmptyResponse`
/// - `{}` → final_answer（致歉文本）
/// - 无法解析为 JSON → `MalformedJson`（保留原文）
/// - 缺少字符串 `name` 或对象 `parameters` → `InvalidSchema`
/// - `name` 未注册 → `UnknownTool`
pub fn parse_decision(raw: &str, registry: &ToolRegistry) -> Result<AgentDecision, DecisionError> {
    if raw.trim().is_empty() {
        return Err(DecisionError::EmptyResponse);
    }
    if strip_fences(raw) == "{}" {
        return Ok(AgentDecision::final_answer(FALLBACK_APOLOGY));
    }

    let parsed = parse_json(raw).map_err(|source| DecisionError::MalformedJson {
        raw: raw.to_string(),
        source,
    })?;
    if is_empty_object(&parsed) {
        return Ok(AgentDecision::final_answer(FALLBACK_APOLOGY));
    }

    let name = parsed.get("name").and_then(Value::as_str);
    let parameters = parsed.get("parameters").and_then(Value::as_object);
    let (Some(name), Some(parameters)) = (name, parameters) else {
        return Err(DecisionError::InvalidSchema { parsed });
    };

    if !registry.contains(name) {
        return Err(DecisionError::UnknownTool(name.to_string()));
    }
    Ok(AgentDecision::new(name, parameters.clone()))
}
