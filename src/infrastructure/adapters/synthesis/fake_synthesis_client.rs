//! Fake Synthesis Client - 用于测试与离线演示的合成客户端
//!
//! 不实际调用合成服务，按配置的行为返回结果

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{
    SpeechSynthesisPort, SynthesisError, SynthesisRequest, SynthesizedAudio,
};

/// Fake 客户端行为
#[derive(Debug, Clone)]
pub enum FakeSynthesisBehavior {
    /// 返回固定音频字节
    Bytes(Vec<u8>),
    /// 返回固定 URI
    Uri(String),
    /// 总是失败（服务不可达）
    Fail,
}

/// Fake Synthesis Client
pub struct FakeSynthesisClient {
    behavior: FakeSynthesisBehavior,
    /// 模拟合成延迟
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl FakeSynthesisClient {
    pub fn new(behavior: FakeSynthesisBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::new(FakeSynthesisBehavior::Fail)
    }

    pub fn returning_bytes(data: Vec<u8>) -> Self {
        Self::new(FakeSynthesisBehavior::Bytes(data))
    }

    pub fn returning_uri(uri: impl Into<String>) -> Self {
        Self::new(FakeSynthesisBehavior::Uri(uri.into()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// synthesize 被调用次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 观察到的最大并发调用数
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// 收到的请求（按到达顺序）
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SpeechSynthesisPort for FakeSynthesisClient {
    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tracing::debug!(
            text_len = request.text.len(),
            voice = %request.voice,
            "FakeSynthesisClient: returning scripted result"
        );

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.behavior {
            FakeSynthesisBehavior::Bytes(data) => Ok(SynthesizedAudio::Bytes {
                data: data.clone(),
                content_type: Some("audio/mpeg".to_string()),
            }),
            FakeSynthesisBehavior::Uri(uri) => Ok(SynthesizedAudio::Uri(uri.clone())),
            FakeSynthesisBehavior::Fail => Err(SynthesisError::NetworkError(
                "fake synthesis service unreachable".to_string(),
            )),
        }
    }

    async fn health_check(&self) -> bool {
        !matches!(self.behavior, FakeSynthesisBehavior::Fail)
    }
}
