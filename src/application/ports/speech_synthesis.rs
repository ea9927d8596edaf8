//! Speech Synthesis Port - 远程语音合成抽象
//!
//! 定义语音合成的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

/// 合成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SynthesisError {
    /// 网络错误与超时可以重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, SynthesisError::NetworkError(_) | SynthesisError::Timeout)
    }
}

/// 合成请求
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub model: String,
    pub speed: f32,
}

/// 合成结果
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesizedAudio {
    /// 原始音频字节（通常为 mp3）
    Bytes {
        data: Vec<u8>,
        content_type: Option<String>,
    },
    /// 服务端已托管的可播放 URI
    Uri(String),
}

/// Speech Synthesis Port
#[async_trait]
pub trait SpeechSynthesisPort: Send + Sync {
    /// 合成语音
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, SynthesisError>;

    /// 检查合成服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
