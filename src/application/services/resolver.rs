//! Audio Resolver - 分层回退解析
//!
//! 解析顺序（短路）:
//! 1. 精确文本匹配的本地资源
//! 2. 分类关键词匹配的本地资源
//!
//! 1、2 两层仅在 prefer_local_asset 时参与
//! 3. 远程语音合成（先查片段存储）
//! 4. 兜底资源（不会失败）

use dashmap::DashMap;
use std::sync::Arc;

use super::AssetAvailabilityChecker;
use crate::application::ports::{
    clip_key, clip_uri, ClipMetadata, ClipStorePort, SpeechSynthesisPort, SynthesisRequest,
    SynthesizedAudio,
};
use crate::domain::asset::{AssetId, AssetIndex};
use crate::domain::audio::{ResolutionError, ResolutionRequest, ResolvedAudio};

/// 本地结果记忆表默认容量
pub const DEFAULT_MEMO_CAPACITY: usize = 4096;

/// 音频解析器
///
/// 只持有注入的缓存；本地结果按 `ResolutionRequest::cache_key` 记忆，
/// 合成与兜底结果不记忆，避免一次服务抖动固化为降级音频。
/// 记忆表写满后不再写入新条目
pub struct AudioResolver {
    index: Arc<AssetIndex>,
    availability: Arc<AssetAvailabilityChecker>,
    synthesizer: Arc<dyn SpeechSynthesisPort>,
    clips: Arc<dyn ClipStorePort>,
    memo: DashMap<String, ResolvedAudio>,
    memo_capacity: usize,
}

impl AudioResolver {
    pub fn new(
        index: Arc<AssetIndex>,
        availability: Arc<AssetAvailabilityChecker>,
        synthesizer: Arc<dyn SpeechSynthesisPort>,
        clips: Arc<dyn ClipStorePort>,
    ) -> Self {
        Self {
            index,
            availability,
            synthesizer,
            clips,
            memo: DashMap::new(),
            memo_capacity: DEFAULT_MEMO_CAPACITY,
        }
    }

    /// 设置记忆表容量，0 表示不记忆
    pub fn with_memo_capacity(mut self, capacity: usize) -> Self {
        self.memo_capacity = capacity;
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 解析文本为可播放资源
    ///
    /// 文本非空时总能返回结果
    pub async fn resolve(&self, request: &ResolutionRequest) -> Result<ResolvedAudio, ResolutionError> {
        request.validate()?;

        let memo_key = request.cache_key();
        if let Some(hit) = self.memo.get(&memo_key) {
            tracing::debug!(uri = %hit.uri(), "Resolution memo hit");
            return Ok(hit.clone());
        }

        if let Some(resolved) = self.resolve_local(request).await {
            if self.memo.len() < self.memo_capacity {
                self.memo.insert(memo_key, resolved.clone());
            } else {
                tracing::debug!(capacity = self.memo_capacity, "Resolution memo full");
            }
            return Ok(resolved);
        }

        if let Some(resolved) = self.resolve_synthesized(request).await {
            return Ok(resolved);
        }

        let uri = self.index.uri(self.index.fallback_default());
        tracing::info!(uri = %uri, "Falling back to default asset");
        Ok(ResolvedAudio::fallback(uri))
    }

    /// 静音资源（占位用）
    pub fn silence(&self) -> ResolvedAudio {
        ResolvedAudio::fallback(self.index.uri(self.index.silence_asset()))
    }

    pub fn index(&self) -> &AssetIndex {
        &self.index
    }

    /// 已记忆的结果数
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }

    /// Tier 1 + Tier 2
    async fn resolve_local(&self, request: &ResolutionRequest) -> Option<ResolvedAudio> {
        if !request.options.prefer_local_asset {
            return None;
        }

        if let Some(asset) = self.index.exact(&request.text) {
            if let Some(resolved) = self.try_asset(asset).await {
                tracing::debug!(asset = %asset, "Resolved by exact text match");
                return Some(resolved);
            }
        }

        if let Some((category, asset)) = self.index.category_match(&request.text) {
            if let Some(resolved) = self.try_asset(asset).await {
                tracing::debug!(category = %category, asset = %asset, "Resolved by category");
                return Some(resolved);
            }
        }

        None
    }

    async fn try_asset(&self, asset: &AssetId) -> Option<ResolvedAudio> {
        let uri = self.index.uri(asset);
        if self.availability.is_available(asset, &uri).await {
            Some(ResolvedAudio::local(uri))
        } else {
            tracing::debug!(asset = %asset, "Local asset unavailable, advancing tier");
            None
        }
    }

    /// Tier 3，失败时返回 None（由兜底处理）
    async fn resolve_synthesized(&self, request: &ResolutionRequest) -> Option<ResolvedAudio> {
        let speed = request.effective_speed();
        let voice = request.options.voice.as_str();
        let model = request.options.model.as_str();
        let key = clip_key(&request.text, voice, model, speed);

        match self.clips.exists(&key).await {
            Ok(true) => {
                tracing::debug!(clip = %key, "Synthesized clip already stored");
                return Some(ResolvedAudio::synthesized(clip_uri(&key)));
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(clip = %key, error = %e, "Clip store lookup failed"),
        }

        let synthesis = SynthesisRequest {
            text: request.text.clone(),
            voice: voice.to_string(),
            model: model.to_string(),
            speed,
        };

        let audio = match self.synthesizer.synthesize(synthesis).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(
                    text_len = request.text.len(),
                    error = %e,
                    "Speech synthesis failed, using fallback"
                );
                return None;
            }
        };

        match audio {
            SynthesizedAudio::Uri(uri) if !uri.is_empty() => Some(ResolvedAudio::synthesized(uri)),
            SynthesizedAudio::Uri(_) => {
                tracing::warn!("Speech synthesis returned an empty URI");
                None
            }
            SynthesizedAudio::Bytes { data, .. } if data.is_empty() => {
                tracing::warn!("Speech synthesis returned no audio");
                None
            }
            SynthesizedAudio::Bytes { data, content_type } => {
                let metadata = ClipMetadata {
                    text_hash: format!("{:x}", md5::compute(request.text.as_bytes())),
                    voice: voice.to_string(),
                    model: model.to_string(),
                    speed,
                    content_type,
                };
                let size = data.len();
                match self.clips.put(&key, data, metadata).await {
                    Ok(()) => {
                        tracing::info!(clip = %key, size_bytes = size, "Synthesized clip stored");
                        Some(ResolvedAudio::synthesized(clip_uri(&key)))
                    }
                    Err(e) => {
                        tracing::warn!(clip = %key, error = %e, "Failed to store synthesized clip");
                        None
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for AudioResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioResolver")
            .field("base_url", &self.index.base_url())
            .field("memoized", &self.memo.len())
            .field("memo_capacity", &self.memo_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::AssetProbePort;
    use crate::domain::asset::AssetMapping;
    use crate::domain::audio::SourceKind;
    use crate::infrastructure::adapters::FakeSynthesisClient;
    use crate::infrastructure::memory::InMemoryClipStore;
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct SetProbe(HashSet<String>);

    #[async_trait]
    impl AssetProbePort for SetProbe {
        async fn exists(&self, uri: &str) -> bool {
            self.0.contains(uri)
        }
    }

    fn mapping() -> AssetMapping {
        AssetMapping::new("silence.mp3", "silence.mp3")
            .with_text("こんにちは", "hello.mp3")
            .with_category(
                "greeting",
                ["こんにちは", "おはよう"],
                Some(AssetId::from("greeting_generic.mp3")),
            )
    }

    fn resolver(available: &[&str], synthesizer: Arc<FakeSynthesisClient>) -> AudioResolver {
        let probe = SetProbe(available.iter().map(|s| s.to_string()).collect());
        AudioResolver::new(
            Arc::new(AssetIndex::new(mapping(), "")),
            Arc::new(AssetAvailabilityChecker::new(Arc::new(probe))),
            synthesizer,
            Arc::new(InMemoryClipStore::new(1024 * 1024)),
        )
    }

    #[tokio::test]
    async fn test_exact_match_wins_over_category() {
        let resolver = resolver(
            &["hello.mp3", "greeting_generic.mp3"],
            Arc::new(FakeSynthesisClient::failing()),
        );
        let resolved = resolver
            .resolve(&ResolutionRequest::new("こんにちは"))
            .await
            .unwrap();

        assert_eq!(resolved.source_kind(), SourceKind::Local);
        assert_eq!(resolved.uri(), "hello.mp3");
        assert!(resolved.cacheable());
    }

    #[tokio::test]
    async fn test_category_tier_when_exact_unavailable() {
        let resolver = resolver(&["greeting_generic.mp3"], Arc::new(FakeSynthesisClient::failing()));
        let resolved = resolver
            .resolve(&ResolutionRequest::new("こんにちは"))
            .await
            .unwrap();

        assert_eq!(resolved.source_kind(), SourceKind::Local);
        assert_eq!(resolved.uri(), "greeting_generic.mp3");
    }

    #[tokio::test]
    async fn test_without_local_preference_category_match_is_synthesized() {
        let synthesizer = Arc::new(FakeSynthesisClient::returning_uri("https://cdn/tts/greet.mp3"));
        let resolver = resolver(&["hello.mp3", "greeting_generic.mp3"], synthesizer.clone());
        let resolved = resolver
            .resolve(&ResolutionRequest::new("こんにちは").prefer_local(false))
            .await
            .unwrap();

        assert_eq!(resolved.source_kind(), SourceKind::Synthesized);
        assert_eq!(resolved.uri(), "https://cdn/tts/greet.mp3");
        assert_eq!(synthesizer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_without_local_preference_failed_synthesis_skips_category() {
        let resolver = resolver(
            &["hello.mp3", "greeting_generic.mp3"],
            Arc::new(FakeSynthesisClient::failing()),
        );
        let resolved = resolver
            .resolve(&ResolutionRequest::new("こんにちは").prefer_local(false))
            .await
            .unwrap();

        assert_eq!(resolved.source_kind(), SourceKind::Fallback);
        assert_eq!(resolved.uri(), "silence.mp3");
    }

    #[tokio::test]
    async fn test_fallback_when_everything_fails() {
        let resolver = resolver(&[], Arc::new(FakeSynthesisClient::failing()));
        let resolved = resolver
            .resolve(&ResolutionRequest::new("こんにちは"))
            .await
            .unwrap();

        assert_eq!(resolved.source_kind(), SourceKind::Fallback);
        assert_eq!(resolved.uri(), "silence.mp3");
    }

    #[tokio::test]
    async fn test_synthesized_bytes_are_stored_as_clip() {
        let synthesizer = Arc::new(FakeSynthesisClient::returning_bytes(vec![0xFF, 0xFB, 0x90]));
        let resolver = resolver(&[], synthesizer.clone());
        let request = ResolutionRequest::new("それは楽しそうですね！").with_speed(0.9);

        let resolved = resolver.resolve(&request).await.unwrap();
        assert_eq!(resolved.source_kind(), SourceKind::Synthesized);
        assert!(!resolved.cacheable());
        assert!(resolved.uri().starts_with("clip://"));

        // 第二次直接命中片段存储，不再调用合成服务
        let again = resolver.resolve(&request).await.unwrap();
        assert_eq!(again.uri(), resolved.uri());
        assert_eq!(synthesizer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_synthesized_uri_is_used_verbatim() {
        let synthesizer = Arc::new(FakeSynthesisClient::returning_uri("https://cdn/tts/1.mp3"));
        let resolver = resolver(&[], synthesizer);
        let resolved = resolver
            .resolve(&ResolutionRequest::new("どんな気持ちでしたか？"))
            .await
            .unwrap();

        assert_eq!(resolved.source_kind(), SourceKind::Synthesized);
        assert_eq!(resolved.uri(), "https://cdn/tts/1.mp3");
    }

    #[tokio::test]
    async fn test_empty_synthesis_falls_back() {
        let resolver = resolver(&[], Arc::new(FakeSynthesisClient::returning_bytes(Vec::new())));
        let resolved = resolver
            .resolve(&ResolutionRequest::new("どんな気持ちでしたか？"))
            .await
            .unwrap();
        assert_eq!(resolved.source_kind(), SourceKind::Fallback);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let resolver = resolver(&[], Arc::new(FakeSynthesisClient::failing()));
        let result = resolver.resolve(&ResolutionRequest::new("")).await;
        assert_eq!(result, Err(ResolutionError::EmptyText));
    }

    #[tokio::test]
    async fn test_local_results_are_deterministic() {
        let resolver = resolver(&["hello.mp3"], Arc::new(FakeSynthesisClient::failing()));
        let request = ResolutionRequest::new("こんにちは");

        let first = resolver.resolve(&request).await.unwrap();
        let second = resolver.resolve(&request).await.unwrap();
        assert_eq!(first.source_kind(), second.source_kind());
        assert_eq!(first.uri(), second.uri());
    }

    #[tokio::test]
    async fn test_fallback_is_not_memoized() {
        let synthesizer = Arc::new(FakeSynthesisClient::failing());
        let resolver = resolver(&[], synthesizer.clone());
        let request = ResolutionRequest::new("なるほど");

        resolver.resolve(&request).await.unwrap();
        resolver.resolve(&request).await.unwrap();
        assert_eq!(synthesizer.call_count(), 2);
    }

    #[tokio::test]
    async fn test_memo_is_bounded() {
        let resolver = resolver(
            &["hello.mp3", "greeting_generic.mp3"],
            Arc::new(FakeSynthesisClient::failing()),
        )
        .with_memo_capacity(1);

        resolver.resolve(&ResolutionRequest::new("こんにちは")).await.unwrap();
        let resolved = resolver
            .resolve(&ResolutionRequest::new("おはようございます"))
            .await
            .unwrap();

        // 记忆表满时仍正常解析
        assert_eq!(resolved.uri(), "greeting_generic.mp3");
        assert_eq!(resolver.memoized(), 1);
    }

    #[test]
    fn test_silence_resource() {
        let resolver = resolver(&[], Arc::new(FakeSynthesisClient::failing()));
        let silence = resolver.silence();
        assert_eq!(silence.source_kind(), SourceKind::Fallback);
        assert_eq!(silence.uri(), "silence.mp3");
    }
}
