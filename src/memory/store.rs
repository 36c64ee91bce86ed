//! 跨会话记忆：工具交互日志 + 滚动对话缓冲 + 相关上下文选择
//!
//! 相关性 = 查询与记录（query 或 output）之间至少共享一个小写空白分词；不依赖向量库。
//! record 是唯一的写操作（写锁串行化），relevant_context 只读。

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::AgentDecision;
use crate::memory::{ConversationBuffer, MemoryError, MemoryPersistence, MemorySnapshot, Message};

/// 一次有输出的工具调用，创建后不再修改
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub query: String,
    pub tool: String,
    pub input: Map<String, Value>,
    pub output: String,
    pub timestamp: DateTime<Utc>,
}

impl MemoryRecord {
    /// 渲染为 (assistant: 工具调用, user: 工具输出) 两条消息
    fn to_messages(&self) -> [Message; 2] {
        let call = serde_json::json!({ "name": self.tool, "parameters": self.input });
        [
            Message::assistant(call.to_string()),
            Message::user(self.output.clone()),
        ]
    }
}

/// 窗口与检索数量
#[derive(Clone, Copy, Debug)]
pub struct MemoryLimits {
    /// 滚动缓冲保留条数
    pub window: usize,
    /// 超过 window 多少条才触发剪枝
    pub hysteresis: usize,
    /// relevant_context 取缓冲末尾的条数
    pub recent: usize,
    /// relevant_context 附加的相关记录上限
    pub max_relevant: usize,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            window: 50,
            hysteresis: 10,
            recent: 15,
            max_relevant: 5,
        }
    }
}

struct MemoryState {
    conversation: ConversationBuffer,
    records: Vec<MemoryRecord>,
    queries: Vec<String>,
}

/// 记忆存储：多次运行共享（`Arc<MemoryStore>`）
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    limits: MemoryLimits,
    persistence: Option<MemoryPersistence>,
    /// 串行化并发 persist，避免两个写入争用同一个临时文件
    persist_lock: Mutex<()>,
}

/// 小写空白分词
fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split_whitespace().map(|w| w.to_lowercase()).collect()
}

impl MemoryStore {
    pub fn new(limits: MemoryLimits) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                conversation: ConversationBuffer::new(limits.window, limits.hysteresis),
                records: Vec::new(),
                queries: Vec::new(),
            }),
            limits,
            persistence: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// 从文件恢复；文件缺失或损坏都按空状态处理（损坏时记 warn）
    pub fn restore(limits: MemoryLimits, path: impl AsRef<Path>) -> Self {
        let persistence = MemoryPersistence::new(path);
        let mut store = Self::new(limits);
        match persistence.load() {
            Ok(Some(snapshot)) => {
                tracing::info!(
                    path = %persistence.path().display(),
                    records = snapshot.records.len(),
                    "memory restored"
                );
                let state = store.state.get_mut().unwrap_or_else(PoisonError::into_inner);
                state.conversation.set_messages(snapshot.conversation);
                state.records = snapshot.records;
                state.queries = snapshot.queries;
            }
            Ok(None) => {
                tracing::debug!(path = %persistence.path().display(), "no memory snapshot, starting empty");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load memory snapshot, starting empty");
            }
        }
        store.persistence = Some(persistence);
        store
    }

    pub fn limits(&self) -> MemoryLimits {
        self.limits
    }

    /// 记录已执行决策：每条有输出的决策生成一条 MemoryRecord 与两条对话消息
    pub fn record(&self, decisions: &[AgentDecision], query: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.queries.iter().any(|q| q == query) {
            state.queries.push(query.to_string());
        }
        for decision in decisions {
            let Some(output) = decision.tool_output.as_deref() else {
                continue;
            };
            if output.trim().is_empty() {
                continue;
            }
            let record = MemoryRecord {
                query: query.to_string(),
                tool: decision.tool_name.clone(),
                input: decision.tool_input.clone(),
                output: output.to_string(),
                timestamp: Utc::now(),
            };
            for msg in record.to_messages() {
                state.conversation.push(msg);
            }
            state.records.push(record);
        }
    }

    /// 组装上下文：缓冲末尾 recent 条 + 至多 max_relevant 条相关记录（按时间倒序）；
    /// 已完整出现在缓冲末尾的记录不再重复注入
    pub fn relevant_context(&self, query: &str) -> Vec<Message> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let recent = state.conversation.recent(self.limits.recent);
        let mut context: Vec<Message> = recent.to_vec();

        let query_tokens = tokenize_lower(query);
        if query_tokens.is_empty() || self.limits.max_relevant == 0 {
            return context;
        }
        let mut hits: Vec<(&MemoryRecord, [Message; 2])> = state
            .records
            .iter()
            .rev()
            .filter(|r| {
                let matches = |text: &str| !tokenize_lower(text).is_disjoint(&query_tokens);
                matches(&r.query) || matches(&r.output)
            })
            .map(|r| (r, r.to_messages()))
            .filter(|(_, pair)| !recent.windows(2).any(|w| w == &pair[..]))
            .collect();
        // 倒序遍历后稳定排序：同一时间戳时后写入的在前
        hits.sort_by(|a, b| b.0.timestamp.cmp(&a.0.timestamp));
        for (_, pair) in hits.into_iter().take(self.limits.max_relevant) {
            context.extend(pair);
        }
        context
    }

    pub fn records(&self) -> Vec<MemoryRecord> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .queries
            .clone()
    }

    pub fn conversation_len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .conversation
            .len()
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 写出快照；未配置持久化路径时什么也不做
    pub fn persist(&self) -> Result<(), MemoryError> {
        let Some(ref persistence) = self.persistence else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            MemorySnapshot {
                conversation: state.conversation.messages().to_vec(),
                records: state.records.clone(),
                queries: state.queries.clone(),
            }
        };
        persistence.save(&snapshot)
    }

    #[cfg(test)]
    fn push_record_at(&self, record: MemoryRecord) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .push(record);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryLimits::default())
    }
}
