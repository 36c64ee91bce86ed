//! 决策输出的 JSON Schema（schemars 生成）
//!
//! 拼入 system prompt，约束模型只输出 `{"name": ..., "parameters": {...}}`。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 模型每轮必须输出的决策格式（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct DecisionFormat {
    /// 工具名，必须是工具列表中的一个
    pub name: String,
    /// 工具参数对象，键名与工具说明一致（大小写敏感）
    pub parameters: HashMap<String, Value>,
}

/// 返回决策格式的 JSON Schema 字符串
pub fn decision_schema_json() -> String {
    let schema = schema_for!(DecisionFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
