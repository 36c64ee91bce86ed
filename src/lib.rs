//! duet - 双智能体问答助手
//!
//! 模块划分：
//! - **agent**: 无头助手运行时（Assistant），带错误降级与记忆持久化
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 决策、会话状态、暂停快照与错误类型
//! - **llm**: LLM 客户端抽象与实现（Ollama / OpenAI 兼容 / Mock）
//! - **memory**: 跨会话记忆（工具交互记录 + 滚动对话缓冲）与持久化
//! - **observability**: tracing 初始化
//! - **react**: 决策解析、Planner、进度事件
//! - **tools**: 工具注册表、执行器与内置工具
//! - **workflow**: 编排图（节点、路由、构建器、执行引擎）

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;
pub mod workflow;

pub use agent::Assistant;
pub use crate::core::{AgentError, RunOutcome};
