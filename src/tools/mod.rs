//! 工具层：注册表、执行器与内置工具（tool_browser / tool_wikipedia / final_answer）

pub mod executor;
pub mod final_answer;
pub mod registry;
pub mod schema;
pub mod search;
pub mod wikipedia;

pub use executor::ToolExecutor;
pub use final_answer::FinalAnswerTool;
pub use registry::{required_str, Tool, ToolRegistry};
pub use schema::decision_schema_json;
pub use search::{WebSearchTool, WEB_SEARCH_TOOL};
pub use wikipedia::{WikipediaTool, WIKIPEDIA_TOOL};

use crate::config::ToolsSection;

/// 注册内置工具
pub fn create_default_registry(cfg: &ToolsSection) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(WebSearchTool::new(&cfg.search));
    registry.register(WikipediaTool::new(&cfg.wikipedia));
    registry.register(FinalAnswerTool);
    registry
}
