//! 播放层端到端测试: 解析 → 无头播放器 → 播放状态机

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

use shadowing::application::ports::{ClipStorePort, MediaEvent};
use shadowing::application::services::{
    AssetAvailabilityChecker, AudioResolver, LoadOptions, PlaybackController,
};
use shadowing::domain::asset::{AssetIndex, AssetMapping};
use shadowing::domain::audio::{ResolutionRequest, ResolvedAudio, SourceKind};
use shadowing::domain::playback::{PlaybackSettings, PlaybackState};
use shadowing::infrastructure::adapters::{
    AssetLocator, FakeSynthesisClient, FileAssetProbe, HeadlessMediaElement,
    HeadlessMediaElementConfig,
};
use shadowing::infrastructure::events::{EventPublisher, PlaybackEvent};
use shadowing::infrastructure::memory::InMemoryClipStore;

/// 单声道 16-bit PCM WAV（静音）
fn wav_bytes(sample_rate: u32, samples: u32) -> Vec<u8> {
    let data_len = samples * 2;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(44 + data_len as usize, 0);
    out
}

struct Rig {
    dir: TempDir,
    clips: Arc<InMemoryClipStore>,
    controller: PlaybackController,
    media_events: mpsc::UnboundedReceiver<MediaEvent>,
    publisher: Arc<EventPublisher>,
}

fn rig() -> Rig {
    let dir = TempDir::new().unwrap();
    let clips = Arc::new(InMemoryClipStore::new(4 * 1024 * 1024));
    let (media, media_events) = HeadlessMediaElement::spawn(
        HeadlessMediaElementConfig {
            locator: AssetLocator::new("/audio", dir.path(), "http://localhost:3000"),
            time_update_interval: Duration::from_millis(20),
            fetch_timeout: Duration::from_secs(1),
        },
        clips.clone(),
    )
    .unwrap();

    let publisher = EventPublisher::new().arc();
    let controller =
        PlaybackController::new(Box::new(media), PlaybackSettings::default(), publisher.clone());

    Rig {
        dir,
        clips,
        controller,
        media_events,
        publisher,
    }
}

impl Rig {
    /// 把媒体事件交给控制器，直到满足条件
    async fn pump_until(&mut self, done: impl Fn(&PlaybackController) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done(&self.controller) {
                let event = self.media_events.recv().await.unwrap();
                self.controller.handle_media_event(event);
            }
        })
        .await
        .unwrap();
    }

    fn write_wav(&self, name: &str, seconds: f64) {
        let samples = (8000.0 * seconds) as u32;
        std::fs::write(self.dir.path().join(name), wav_bytes(8000, samples)).unwrap();
    }
}

#[tokio::test]
async fn resolved_local_asset_plays_to_end() {
    let mut rig = rig();
    rig.write_wav("hello.wav", 0.1);

    let mapping = AssetMapping::new("silence.wav", "silence.wav").with_text("こんにちは", "hello.wav");
    let resolver = AudioResolver::new(
        Arc::new(AssetIndex::new(mapping, "/audio")),
        AssetAvailabilityChecker::new(Arc::new(FileAssetProbe::new(AssetLocator::new(
            "/audio",
            rig.dir.path(),
            "http://localhost:3000",
        ))))
        .arc(),
        Arc::new(FakeSynthesisClient::failing()),
        rig.clips.clone(),
    );

    let resolved = resolver
        .resolve(&ResolutionRequest::new("こんにちは"))
        .await
        .unwrap();
    assert_eq!(resolved.source_kind(), SourceKind::Local);
    assert_eq!(resolved.uri(), "/audio/hello.wav");

    let ended = Arc::new(AtomicUsize::new(0));
    let counter = ended.clone();
    rig.controller.set_on_ended(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    rig.controller.load(resolved, LoadOptions::auto_play());
    rig.pump_until(|c| c.state() == PlaybackState::Ended).await;

    assert_eq!(ended.load(Ordering::SeqCst), 1);
    assert!((rig.controller.session().duration() - 0.1).abs() < 1e-6);
}

#[tokio::test]
async fn synthesized_clip_plays_from_store() {
    let mut rig = rig();
    let mapping = AssetMapping::new("silence.wav", "silence.wav");
    let resolver = AudioResolver::new(
        Arc::new(AssetIndex::new(mapping, "/audio")),
        AssetAvailabilityChecker::new(Arc::new(FileAssetProbe::new(AssetLocator::new(
            "/audio",
            rig.dir.path(),
            "http://localhost:3000",
        ))))
        .arc(),
        Arc::new(FakeSynthesisClient::returning_bytes(wav_bytes(8000, 400))),
        rig.clips.clone(),
    );

    let resolved = resolver
        .resolve(&ResolutionRequest::new("それは楽しそうですね！"))
        .await
        .unwrap();
    assert_eq!(resolved.source_kind(), SourceKind::Synthesized);
    assert_eq!(rig.clips.stats().await.total_entries, 1);

    rig.controller.load(resolved, LoadOptions::default());
    rig.pump_until(|c| c.state() == PlaybackState::Ready).await;
    assert!((rig.controller.session().duration() - 0.05).abs() < 1e-6);
}

#[tokio::test]
async fn later_load_wins_over_earlier_one() {
    let mut rig = rig();
    rig.write_wav("a.wav", 2.0);
    rig.write_wav("b.wav", 0.5);

    rig.controller
        .load(ResolvedAudio::local("/audio/a.wav"), LoadOptions::auto_play());
    let b = rig
        .controller
        .load(ResolvedAudio::local("/audio/b.wav"), LoadOptions::default());

    rig.pump_until(|c| c.state() == PlaybackState::Ready).await;

    assert_eq!(rig.controller.current_token(), Some(b));
    assert_eq!(rig.controller.session().resource().unwrap().uri(), "/audio/b.wav");
    assert!((rig.controller.session().duration() - 0.5).abs() < 1e-6);
}

#[tokio::test]
async fn loop_keeps_playing_without_ended_callback() {
    let mut rig = rig();
    rig.write_wav("short.wav", 0.05);

    let ended = Arc::new(AtomicUsize::new(0));
    let counter = ended.clone();
    rig.controller.set_on_ended(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut events = rig.publisher.subscribe(rig.controller.session_id()).unwrap();

    rig.controller.set_loop(true);
    rig.controller
        .load(ResolvedAudio::local("/audio/short.wav"), LoadOptions::auto_play());
    rig.pump_until(|c| c.state() == PlaybackState::Playing).await;

    // 至少经过两个循环
    tokio::time::sleep(Duration::from_millis(200)).await;
    while let Ok(event) = rig.media_events.try_recv() {
        rig.controller.handle_media_event(event);
    }

    assert_eq!(rig.controller.state(), PlaybackState::Playing);
    assert_eq!(ended.load(Ordering::SeqCst), 0);
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, PlaybackEvent::Ended { .. }));
    }
}

#[tokio::test]
async fn undecodable_resource_errors_and_reload_recovers() {
    let mut rig = rig();
    std::fs::write(rig.dir.path().join("broken.mp3"), [0x00, 0x01, 0x02]).unwrap();
    rig.write_wav("ok.wav", 0.1);

    rig.controller
        .load(ResolvedAudio::local("/audio/broken.mp3"), LoadOptions::auto_play());
    rig.pump_until(|c| c.state() == PlaybackState::Errored).await;
    assert!(rig.controller.session().error().is_some());

    rig.controller
        .load(ResolvedAudio::local("/audio/ok.wav"), LoadOptions::default());
    rig.pump_until(|c| c.state() == PlaybackState::Ready).await;
    assert!(rig.controller.session().error().is_none());
}

#[tokio::test]
async fn rate_is_clamped_end_to_end() {
    let mut rig = rig();
    rig.write_wav("a.wav", 1.0);

    rig.controller
        .load(ResolvedAudio::local("/audio/a.wav"), LoadOptions::auto_play());
    rig.pump_until(|c| c.state() == PlaybackState::Playing).await;

    assert_eq!(rig.controller.set_rate(3.0), 2.0);
    assert_eq!(rig.controller.session().rate(), 2.0);
    assert_eq!(rig.controller.state(), PlaybackState::Playing);
}
