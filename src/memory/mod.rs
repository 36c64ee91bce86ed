//! 记忆层：对话消息与滚动缓冲、跨会话工具交互记录、持久化

pub mod conversation;
pub mod persistence;
pub mod store;

pub use conversation::{ConversationBuffer, Message, Role};
pub use persistence::{MemoryError, MemoryPersistence, MemorySnapshot};
pub use store::{MemoryLimits, MemoryRecord, MemoryStore};
