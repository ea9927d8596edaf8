//! HTTP Synthesis Client - 调用外部语音合成 HTTP 服务
//!
//! 实现 SpeechSynthesisPort trait
//!
//! 外部合成 API:
//! POST http://localhost:8000/api/text-to-speech
//! Request: {"text": "...", "voice": "alloy", "model": "tts-1", "speed": 1.0}  (JSON)
//! Response: audio/mpeg binary

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{
    SpeechSynthesisPort, SynthesisError, SynthesisRequest, SynthesizedAudio,
};

/// 合成请求体 (JSON)
#[derive(Debug, Serialize)]
struct SynthesisHttpRequest<'a> {
    text: &'a str,
    voice: &'a str,
    model: &'a str,
    speed: f32,
}

/// HTTP 合成客户端配置
#[derive(Debug, Clone)]
pub struct HttpSynthesisClientConfig {
    /// 合成服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 重试次数（仅网络错误与超时）
    pub max_retries: u32,
}

impl Default for HttpSynthesisClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            max_retries: 0,
        }
    }
}

impl HttpSynthesisClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// HTTP 合成客户端
pub struct HttpSynthesisClient {
    client: Client,
    config: HttpSynthesisClientConfig,
}

impl HttpSynthesisClient {
    pub fn new(config: HttpSynthesisClientConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn synthesize_url(&self) -> String {
        format!("{}/api/text-to-speech", self.config.base_url.trim_end_matches('/'))
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url.trim_end_matches('/'))
    }

    async fn synthesize_once(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        let body = SynthesisHttpRequest {
            text: &request.text,
            voice: &request.voice,
            model: &request.model,
            speed: request.speed,
        };

        let response = self
            .client
            .post(self.synthesize_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout
                } else if e.is_connect() {
                    SynthesisError::NetworkError(format!(
                        "Cannot connect to synthesis service: {}",
                        e
                    ))
                } else {
                    SynthesisError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let data = response
            .bytes()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout
                } else {
                    SynthesisError::InvalidResponse(format!("Failed to read audio: {}", e))
                }
            })?
            .to_vec();

        if data.is_empty() {
            return Err(SynthesisError::InvalidResponse(
                "Empty audio body".to_string(),
            ));
        }

        Ok(SynthesizedAudio::Bytes { data, content_type })
    }
}

#[async_trait]
impl SpeechSynthesisPort for HttpSynthesisClient {
    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> Result<SynthesizedAudio, SynthesisError> {
        tracing::debug!(
            url = %self.synthesize_url(),
            text_len = request.text.len(),
            voice = %request.voice,
            model = %request.model,
            speed = request.speed,
            "Sending synthesis request"
        );

        let mut attempt = 0;
        loop {
            match self.synthesize_once(&request).await {
                Ok(audio) => {
                    if let SynthesizedAudio::Bytes { data, .. } = &audio {
                        tracing::info!(
                            audio_size = data.len(),
                            attempts = attempt + 1,
                            "Synthesis completed"
                        );
                    }
                    return Ok(audio);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        attempt = attempt,
                        max_retries = self.config.max_retries,
                        "Synthesis request failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = HttpSynthesisClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = HttpSynthesisClientConfig::new("http://example.com:9000/")
            .with_timeout(60)
            .with_retries(2);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.max_retries, 2);

        let client = HttpSynthesisClient::new(config).unwrap();
        assert_eq!(
            client.synthesize_url(),
            "http://example.com:9000/api/text-to-speech"
        );
        assert_eq!(client.health_url(), "http://example.com:9000/health");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        // 端口 9 (discard) 通常无人监听
        let client = HttpSynthesisClient::new(
            HttpSynthesisClientConfig::new("http://127.0.0.1:9").with_timeout(2),
        )
        .unwrap();

        let result = client
            .synthesize(SynthesisRequest {
                text: "こんにちは".to_string(),
                voice: "alloy".to_string(),
                model: "tts-1".to_string(),
                speed: 1.0,
            })
            .await;
        assert!(matches!(
            result,
            Err(SynthesisError::NetworkError(_)) | Err(SynthesisError::Timeout)
        ));
        assert!(!client.health_check().await);
    }
}
