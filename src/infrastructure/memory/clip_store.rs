//! In-Memory Clip Store Implementation
//!
//! 进程内 LRU 片段存储，用于测试与 `cache.persistent = false`

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::application::ports::{ClipMetadata, ClipStoreError, ClipStorePort, ClipStoreStats};

struct ClipEntry {
    audio_data: Vec<u8>,
    last_accessed: AtomicU64,
}

/// 内存片段存储
pub struct InMemoryClipStore {
    clips: DashMap<String, ClipEntry>,
    max_size_bytes: u64,
    current_size: AtomicU64,
    access_seq: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    /// 串行化写入与淘汰
    write_lock: Mutex<()>,
}

impl InMemoryClipStore {
    pub fn new(max_size_bytes: u64) -> Self {
        Self {
            clips: DashMap::new(),
            max_size_bytes,
            current_size: AtomicU64::new(0),
            access_seq: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn next_seq(&self) -> u64 {
        self.access_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn remove_entry(&self, key: &str) {
        if let Some((_, entry)) = self.clips.remove(key) {
            self.current_size
                .fetch_sub(entry.audio_data.len() as u64, Ordering::Relaxed);
        }
    }

    fn evict_lru(&self) -> bool {
        let oldest = self
            .clips
            .iter()
            .min_by_key(|entry| entry.value().last_accessed.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone());

        match oldest {
            Some(key) => {
                self.remove_entry(&key);
                tracing::debug!(key = %key, "LRU evicted clip");
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ClipStorePort for InMemoryClipStore {
    async fn put(
        &self,
        key: &str,
        audio: Vec<u8>,
        _metadata: ClipMetadata,
    ) -> Result<(), ClipStoreError> {
        let size = audio.len() as u64;
        if size > self.max_size_bytes {
            return Err(ClipStoreError::TooLarge {
                size,
                capacity: self.max_size_bytes,
            });
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| ClipStoreError::DatabaseError(e.to_string()))?;

        self.remove_entry(key);
        while self.current_size.load(Ordering::Relaxed) + size > self.max_size_bytes {
            if !self.evict_lru() {
                break;
            }
        }

        self.clips.insert(
            key.to_string(),
            ClipEntry {
                audio_data: audio,
                last_accessed: AtomicU64::new(self.next_seq()),
            },
        );
        self.current_size.fetch_add(size, Ordering::Relaxed);

        tracing::debug!(key = %key, size_bytes = size, "Clip stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ClipStoreError> {
        match self.clips.get(key) {
            Some(entry) => {
                entry.last_accessed.store(self.next_seq(), Ordering::Relaxed);
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.audio_data.clone()))
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, ClipStoreError> {
        Ok(self.clips.contains_key(key))
    }

    async fn stats(&self) -> ClipStoreStats {
        ClipStoreStats {
            total_entries: self.clips.len(),
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            max_size_bytes: self.max_size_bytes,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ClipMetadata {
        ClipMetadata {
            text_hash: "hash".to_string(),
            voice: "alloy".to_string(),
            model: "tts-1".to_string(),
            speed: 1.0,
            content_type: None,
        }
    }

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let store = InMemoryClipStore::new(64);
        store.put("k", vec![1, 2, 3], metadata()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(vec![1, 2, 3]));

        store.put("k", vec![4, 5], metadata()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(vec![4, 5]));

        let stats = store.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 2);
        assert_eq!(stats.hit_count, 2);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let store = InMemoryClipStore::new(10);
        store.put("a", vec![0; 4], metadata()).await.unwrap();
        store.put("b", vec![0; 4], metadata()).await.unwrap();
        store.get("a").await.unwrap();
        store.put("c", vec![0; 4], metadata()).await.unwrap();

        assert!(store.exists("a").await.unwrap());
        assert!(!store.exists("b").await.unwrap());
        assert!(store.exists("c").await.unwrap());

        let stats = store.stats().await;
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_size_bytes, 8);
    }

    #[tokio::test]
    async fn test_oversized_clip_rejected() {
        let store = InMemoryClipStore::new(2);
        assert!(matches!(
            store.put("k", vec![0; 3], metadata()).await,
            Err(ClipStoreError::TooLarge { .. })
        ));
    }
}
