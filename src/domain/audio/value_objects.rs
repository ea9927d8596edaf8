//! Audio Context - Value Objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ResolutionError;

/// 合成音色标识（如 alloy）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceId(String);

impl VoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VoiceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 合成模型标识（如 tts-1）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 解析参数模板（预加载批次共用）
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionOptions {
    pub prefer_local_asset: bool,
    pub voice: VoiceId,
    pub model: ModelId,
    /// 语速，必须 > 0
    pub speed: f32,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            prefer_local_asset: true,
            voice: VoiceId::from("alloy"),
            model: ModelId::from("tts-1"),
            speed: 1.0,
        }
    }
}

impl ResolutionOptions {
    pub fn prefer_local(mut self, prefer: bool) -> Self {
        self.prefer_local_asset = prefer;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// 用模板生成一个请求
    pub fn request(&self, text: impl Into<String>) -> ResolutionRequest {
        ResolutionRequest {
            text: text.into(),
            options: self.clone(),
        }
    }
}

/// 解析请求
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionRequest {
    pub text: String,
    pub options: ResolutionOptions,
}

impl ResolutionRequest {
    /// 使用默认参数创建请求
    pub fn new(text: impl Into<String>) -> Self {
        ResolutionOptions::default().request(text)
    }

    pub fn prefer_local(mut self, prefer: bool) -> Self {
        self.options.prefer_local_asset = prefer;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.options.voice = VoiceId::new(voice);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.options.model = ModelId::new(model);
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.options.speed = speed;
        self
    }

    /// 前置条件: 文本去除空白后非空
    pub fn validate(&self) -> Result<(), ResolutionError> {
        if self.text.trim().is_empty() {
            return Err(ResolutionError::EmptyText);
        }
        Ok(())
    }

    /// 结果缓存 key: 文本 + 音色 + 模型 + 有效语速 + 本地优先
    ///
    /// 任一参数不同都可能解析出不同的音频
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}:{:.2}:{}",
            self.text,
            self.options.voice,
            self.options.model,
            self.effective_speed(),
            self.options.prefer_local_asset
        )
    }

    /// 有效语速（非有限值或 <= 0 时回落到 1.0）
    pub fn effective_speed(&self) -> f32 {
        if self.options.speed.is_finite() && self.options.speed > 0.0 {
            self.options.speed
        } else {
            1.0
        }
    }
}

/// 音频来源种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// 本地预渲染音频
    Local,
    /// 远程合成音频
    Synthesized,
    /// 兜底音频
    Fallback,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Local => "local",
            SourceKind::Synthesized => "synthesized",
            SourceKind::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解析结果（不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAudio {
    source_kind: SourceKind,
    uri: String,
    cacheable: bool,
    resolved_at: DateTime<Utc>,
}

impl ResolvedAudio {
    pub fn local(uri: impl Into<String>) -> Self {
        Self::build(SourceKind::Local, uri.into(), true)
    }

    pub fn synthesized(uri: impl Into<String>) -> Self {
        Self::build(SourceKind::Synthesized, uri.into(), false)
    }

    pub fn fallback(uri: impl Into<String>) -> Self {
        Self::build(SourceKind::Fallback, uri.into(), true)
    }

    fn build(source_kind: SourceKind, uri: String, cacheable: bool) -> Self {
        Self {
            source_kind,
            uri,
            cacheable,
            resolved_at: Utc::now(),
        }
    }

    // Getters
    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn cacheable(&self) -> bool {
        self.cacheable
    }

    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = ResolutionRequest::new("こんにちは");
        assert!(request.options.prefer_local_asset);
        assert_eq!(request.options.voice.as_str(), "alloy");
        assert_eq!(request.options.model.as_str(), "tts-1");
        assert_eq!(request.options.speed, 1.0);
    }

    #[test]
    fn test_blank_text_rejected() {
        assert_eq!(
            ResolutionRequest::new("  \n").validate(),
            Err(ResolutionError::EmptyText)
        );
        assert!(ResolutionRequest::new("はい").validate().is_ok());
    }

    #[test]
    fn test_effective_speed() {
        assert_eq!(ResolutionRequest::new("a").with_speed(0.9).effective_speed(), 0.9);
        assert_eq!(ResolutionRequest::new("a").with_speed(0.0).effective_speed(), 1.0);
        assert_eq!(
            ResolutionRequest::new("a").with_speed(f32::NAN).effective_speed(),
            1.0
        );
    }

    #[test]
    fn test_cache_key_separates_options() {
        let base = ResolutionRequest::new("はい");
        assert_eq!(base.cache_key(), ResolutionRequest::new("はい").cache_key());
        assert_ne!(base.cache_key(), base.clone().with_voice("nova").cache_key());
        assert_ne!(base.cache_key(), base.clone().with_speed(0.8).cache_key());
        assert_ne!(base.cache_key(), base.clone().prefer_local(false).cache_key());
        // 无效语速与 1.0 等价
        assert_eq!(base.cache_key(), base.clone().with_speed(-1.0).cache_key());
    }

    #[test]
    fn test_cacheable_by_kind() {
        assert!(ResolvedAudio::local("a.mp3").cacheable());
        assert!(!ResolvedAudio::synthesized("clip://k").cacheable());
        assert!(ResolvedAudio::fallback("silence.mp3").cacheable());
    }
}
