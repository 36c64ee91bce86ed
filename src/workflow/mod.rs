//! 编排图：节点、路由边、构建器与执行引擎

pub mod builder;
pub mod engine;
pub mod node;
pub mod router;

pub use builder::GraphBuilder;
pub use engine::{OrchestrationGraph, ITERATION_LIMIT_ANSWER};
pub use node::Node;
pub use router::{EnrichmentPolicy, UncertaintyHeuristic};
