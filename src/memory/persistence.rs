//! 记忆持久化
//!
//! 单文件 JSON 快照：滚动对话缓冲、MemoryRecord 日志、已见查询列表。
//! 写入先落到同目录的临时文件再 rename 覆盖，进程中途崩溃不会破坏上一次成功写入的内容。

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::{MemoryRecord, Message};

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("memory io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("memory snapshot is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// 持久化文档的结构
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    #[serde(default)]
    pub conversation: Vec<Message>,
    #[serde(default)]
    pub records: Vec<MemoryRecord>,
    #[serde(default)]
    pub queries: Vec<String>,
}

/// 文件持久化：load 读取快照，save 原子替换
#[derive(Debug, Clone)]
pub struct MemoryPersistence {
    path: PathBuf,
}

impl MemoryPersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取快照；文件不存在时返回 None（视为空初始状态，不是错误）
    pub fn load(&self) -> Result<Option<MemorySnapshot>, MemoryError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path).map_err(|source| MemoryError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    /// 写入快照；父目录不存在时自动创建
    pub fn save(&self, snapshot: &MemorySnapshot) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| MemoryError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(snapshot)?;
        let tmp_path = self.tmp_path();
        let write_tmp = || -> std::io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            // 先落盘再 rename
            file.sync_all()
        };
        write_tmp().map_err(|source| MemoryError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|source| MemoryError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(
            path = %self.path.display(),
            records = snapshot.records.len(),
            "memory snapshot saved"
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "memory.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
