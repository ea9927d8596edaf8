//! Sled-based LRU Clip Store Implementation
//!
//! 合成片段跨进程重启保留；访问顺序由单调递增的访问序号记录

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{ClipMetadata, ClipStoreError, ClipStorePort, ClipStoreStats};

const CLIP_PREFIX: &str = "clip:";

/// Sled 片段存储配置
#[derive(Debug, Clone)]
pub struct SledClipStoreConfig {
    /// 数据库路径
    pub db_path: String,
    /// 最大存储大小（字节）
    pub max_size_bytes: u64,
}

impl Default for SledClipStoreConfig {
    fn default() -> Self {
        Self {
            db_path: "data/clips.sled".to_string(),
            max_size_bytes: 256 * 1024 * 1024, // 256MB
        }
    }
}

/// 内部片段条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalClipEntry {
    audio_data: Vec<u8>,
    size_bytes: u64,
    text_hash: String,
    voice: String,
    model: String,
    speed: f32,
    content_type: Option<String>,
    last_accessed: u64,
    created_at: i64,
}

/// Sled 片段存储
pub struct SledClipStore {
    db: Db,
    max_size_bytes: u64,
    current_size: AtomicU64,
    access_seq: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl SledClipStore {
    pub fn new(config: &SledClipStoreConfig) -> Result<Self, ClipStoreError> {
        let db = sled::open(&config.db_path)
            .map_err(|e| ClipStoreError::DatabaseError(e.to_string()))?;

        let (current_size, last_seq) = Self::scan_totals(&db)?;

        tracing::info!(
            db_path = %config.db_path,
            max_size_bytes = config.max_size_bytes,
            current_size = current_size,
            "SledClipStore initialized"
        );

        Ok(Self {
            db,
            max_size_bytes: config.max_size_bytes,
            current_size: AtomicU64::new(current_size),
            access_seq: AtomicU64::new(last_seq),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    pub fn open<P: AsRef<Path>>(path: P, max_size_bytes: u64) -> Result<Self, ClipStoreError> {
        let config = SledClipStoreConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
            max_size_bytes,
        };
        Self::new(&config)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 计算已存条目的总大小与最大访问序号
    fn scan_totals(db: &Db) -> Result<(u64, u64), ClipStoreError> {
        let mut total = 0u64;
        let mut last_seq = 0u64;
        for item in db.scan_prefix(CLIP_PREFIX) {
            let (_, value) = item.map_err(|e| ClipStoreError::DatabaseError(e.to_string()))?;
            if let Ok(entry) = bincode::deserialize::<InternalClipEntry>(&value) {
                total += entry.size_bytes;
                last_seq = last_seq.max(entry.last_accessed);
            }
        }
        Ok((total, last_seq))
    }

    fn next_seq(&self) -> u64 {
        self.access_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn db_key(key: &str) -> String {
        format!("{}{}", CLIP_PREFIX, key)
    }

    /// LRU 淘汰，返回是否淘汰了条目
    fn evict_lru(&self) -> Result<bool, ClipStoreError> {
        let mut oldest: Option<(sled::IVec, InternalClipEntry)> = None;

        for item in self.db.scan_prefix(CLIP_PREFIX) {
            let (key, value) = item.map_err(|e| ClipStoreError::DatabaseError(e.to_string()))?;
            if let Ok(entry) = bincode::deserialize::<InternalClipEntry>(&value) {
                let is_older = oldest
                    .as_ref()
                    .map(|(_, e)| entry.last_accessed < e.last_accessed)
                    .unwrap_or(true);

                if is_older {
                    oldest = Some((key, entry));
                }
            }
        }

        let Some((key, entry)) = oldest else {
            return Ok(false);
        };

        self.db
            .remove(&key)
            .map_err(|e| ClipStoreError::DatabaseError(e.to_string()))?;
        self.current_size.fetch_sub(entry.size_bytes, Ordering::Relaxed);

        tracing::debug!(
            key = %String::from_utf8_lossy(&key),
            size_bytes = entry.size_bytes,
            "LRU evicted clip"
        );
        Ok(true)
    }

    /// 删除条目并归还容量
    fn remove_entry(&self, key: &str) -> Result<(), ClipStoreError> {
        if let Some(data) = self
            .db
            .remove(Self::db_key(key))
            .map_err(|e| ClipStoreError::DatabaseError(e.to_string()))?
        {
            if let Ok(entry) = bincode::deserialize::<InternalClipEntry>(&data) {
                self.current_size.fetch_sub(entry.size_bytes, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), ClipStoreError> {
        self.db
            .flush()
            .map_err(|e| ClipStoreError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ClipStorePort for SledClipStore {
    async fn put(
        &self,
        key: &str,
        audio: Vec<u8>,
        metadata: ClipMetadata,
    ) -> Result<(), ClipStoreError> {
        let size = audio.len() as u64;
        if size > self.max_size_bytes {
            return Err(ClipStoreError::TooLarge {
                size,
                capacity: self.max_size_bytes,
            });
        }

        // 覆盖写先释放旧条目
        self.remove_entry(key)?;

        while self.current_size.load(Ordering::Relaxed) + size > self.max_size_bytes {
            if !self.evict_lru()? {
                break;
            }
        }

        let entry = InternalClipEntry {
            audio_data: audio,
            size_bytes: size,
            text_hash: metadata.text_hash,
            voice: metadata.voice,
            model: metadata.model,
            speed: metadata.speed,
            content_type: metadata.content_type,
            last_accessed: self.next_seq(),
            created_at: Utc::now().timestamp(),
        };

        let entry_bytes = bincode::serialize(&entry)
            .map_err(|e| ClipStoreError::SerializationError(e.to_string()))?;

        self.db
            .insert(Self::db_key(key), entry_bytes)
            .map_err(|e| ClipStoreError::DatabaseError(e.to_string()))?;

        self.current_size.fetch_add(size, Ordering::Relaxed);

        tracing::debug!(key = %key, size_bytes = size, "Clip stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ClipStoreError> {
        let db_key = Self::db_key(key);

        match self.db.get(&db_key) {
            Ok(Some(data)) => {
                let mut entry: InternalClipEntry = bincode::deserialize(&data)
                    .map_err(|e| ClipStoreError::SerializationError(e.to_string()))?;

                // LRU touch
                entry.last_accessed = self.next_seq();
                let entry_bytes = bincode::serialize(&entry)
                    .map_err(|e| ClipStoreError::SerializationError(e.to_string()))?;
                self.db
                    .insert(&db_key, entry_bytes)
                    .map_err(|e| ClipStoreError::DatabaseError(e.to_string()))?;

                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.audio_data))
            }
            Ok(None) => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(e) => Err(ClipStoreError::DatabaseError(e.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, ClipStoreError> {
        self.db
            .contains_key(Self::db_key(key))
            .map_err(|e| ClipStoreError::DatabaseError(e.to_string()))
    }

    async fn stats(&self) -> ClipStoreStats {
        ClipStoreStats {
            total_entries: self.db.scan_prefix(CLIP_PREFIX).count(),
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            max_size_bytes: self.max_size_bytes,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}
