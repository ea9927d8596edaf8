//! Clip Store Port - 合成音频片段存储
//!
//! 合成得到的音频字节存入片段存储，以 `clip://<key>` URI 交给播放层

use async_trait::async_trait;
use thiserror::Error;

/// 片段 URI 前缀
pub const CLIP_URI_SCHEME: &str = "clip://";

/// Clip Store 错误
#[derive(Debug, Error)]
pub enum ClipStoreError {
    #[error("Clip too large: {size} bytes exceeds capacity {capacity}")]
    TooLarge { size: u64, capacity: u64 },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// 片段元数据
#[derive(Debug, Clone, PartialEq)]
pub struct ClipMetadata {
    pub text_hash: String,
    pub voice: String,
    pub model: String,
    pub speed: f32,
    pub content_type: Option<String>,
}

/// 片段存储统计信息
#[derive(Debug, Clone, Default)]
pub struct ClipStoreStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
}

/// Clip Store Port
///
/// 容量受限的 LRU 存储
#[async_trait]
pub trait ClipStorePort: Send + Sync {
    /// 存储片段，必要时淘汰最久未访问的片段
    async fn put(&self, key: &str, audio: Vec<u8>, metadata: ClipMetadata) -> Result<(), ClipStoreError>;

    /// 读取片段（同时更新访问时间）
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ClipStoreError>;

    /// 检查片段是否存在
    async fn exists(&self, key: &str) -> Result<bool, ClipStoreError>;

    /// 统计信息
    async fn stats(&self) -> ClipStoreStats;
}

/// 生成片段 key
///
/// md5(text) + voice + model + speed
pub fn clip_key(text: &str, voice: &str, model: &str, speed: f32) -> String {
    let digest = md5::compute(text.as_bytes());
    format!("{:x}:{}:{}:{:.2}", digest, voice, model, speed)
}

pub fn clip_uri(key: &str) -> String {
    format!("{}{}", CLIP_URI_SCHEME, key)
}

/// 从 `clip://` URI 中取出 key
pub fn clip_key_from_uri(uri: &str) -> Option<&str> {
    uri.strip_prefix(CLIP_URI_SCHEME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_key_is_stable_and_parameterized() {
        let a = clip_key("こんにちは", "alloy", "tts-1", 0.9);
        assert_eq!(a, clip_key("こんにちは", "alloy", "tts-1", 0.9));
        assert_ne!(a, clip_key("こんにちは", "alloy", "tts-1", 1.0));
        assert_ne!(a, clip_key("こんにちは", "nova", "tts-1", 0.9));
        assert!(a.ends_with(":alloy:tts-1:0.90"));
    }

    #[test]
    fn test_clip_uri_round_trip() {
        let uri = clip_uri("abc:alloy:tts-1:1.00");
        assert_eq!(uri, "clip://abc:alloy:tts-1:1.00");
        assert_eq!(clip_key_from_uri(&uri), Some("abc:alloy:tts-1:1.00"));
        assert_eq!(clip_key_from_uri("/audio/hello.mp3"), None);
    }
}
