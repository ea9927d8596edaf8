//! Headless Media Element - 无输出设备的媒体播放原语
//!
//! 获取资源（本地文件、http(s)、`clip://`），用 symphonia 探测时长，
//! 播放时由时钟推进位置并回传 TimeUpdate / ReachedEnd 事件。
//! 不解码输出 PCM，适用于服务端与测试环境。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use super::probe_duration;
use crate::application::ports::{
    clip_key_from_uri, ClipStorePort, MediaElementPort, MediaError, MediaEvent, MediaEventKind,
};
use crate::domain::playback::LoadToken;
use crate::infrastructure::adapters::{is_remote, AssetLocator};

/// 无头播放器配置
#[derive(Debug, Clone)]
pub struct HeadlessMediaElementConfig {
    pub locator: AssetLocator,
    /// 播放进度事件间隔
    pub time_update_interval: Duration,
    /// http 资源获取超时
    pub fetch_timeout: Duration,
}

enum Command {
    Load { token: LoadToken, uri: String },
    Play,
    Pause,
    Seek(f64),
    Rate(f64),
    Volume(f64),
    Stop,
}

/// 无头播放器
///
/// 命令通过通道交给后台驱动任务执行；元素被 drop 时驱动任务退出
pub struct HeadlessMediaElement {
    commands: mpsc::UnboundedSender<Command>,
}

impl HeadlessMediaElement {
    /// 创建播放器并启动驱动任务，返回媒体事件接收端
    ///
    /// 必须在 tokio 运行时内调用
    pub fn spawn(
        config: HeadlessMediaElementConfig,
        clips: Arc<dyn ClipStorePort>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<MediaEvent>), MediaError> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| MediaError::Fetch(e.to_string()))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let fetcher = Arc::new(Fetcher {
            locator: config.locator,
            clips,
            http,
        });
        let driver = Driver::new(fetcher, event_tx, config.time_update_interval);
        tokio::spawn(driver.run(command_rx));

        Ok((Self { commands: command_tx }, event_rx))
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Media driver stopped, command dropped");
        }
    }
}

impl MediaElementPort for HeadlessMediaElement {
    fn load(&mut self, token: LoadToken, uri: &str) {
        self.send(Command::Load {
            token,
            uri: uri.to_string(),
        });
    }

    fn play(&mut self) {
        self.send(Command::Play);
    }

    fn pause(&mut self) {
        self.send(Command::Pause);
    }

    fn seek(&mut self, position: f64) {
        self.send(Command::Seek(position));
    }

    fn set_rate(&mut self, rate: f64) {
        self.send(Command::Rate(rate));
    }

    fn set_volume(&mut self, volume: f64) {
        self.send(Command::Volume(volume));
    }

    fn stop(&mut self) {
        self.send(Command::Stop);
    }
}

// ============================================================================
// 资源获取
// ============================================================================

struct Fetcher {
    locator: AssetLocator,
    clips: Arc<dyn ClipStorePort>,
    http: reqwest::Client,
}

impl Fetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, MediaError> {
        if let Some(key) = clip_key_from_uri(uri) {
            return self
                .clips
                .get(key)
                .await
                .map_err(|e| MediaError::Fetch(e.to_string()))?
                .ok_or_else(|| MediaError::NotFound(uri.to_string()));
        }

        if is_remote(uri) {
            let response = self
                .http
                .get(uri)
                .send()
                .await
                .map_err(|e| MediaError::Fetch(e.to_string()))?;
            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(MediaError::NotFound(uri.to_string()));
            }
            if !status.is_success() {
                return Err(MediaError::Fetch(format!("HTTP {}", status)));
            }
            return response
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(|e| MediaError::Fetch(e.to_string()));
        }

        let path = self
            .locator
            .local_path(uri)
            .ok_or_else(|| MediaError::NotFound(uri.to_string()))?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MediaError::NotFound(path.display().to_string())
            } else {
                MediaError::Fetch(e.to_string())
            }
        })
    }

    /// 获取并探测时长
    async fn load(&self, uri: &str) -> Result<f64, MediaError> {
        let data = self.fetch(uri).await?;
        let extension = extension_of(uri);

        tokio::task::spawn_blocking(move || probe_duration(data, extension.as_deref()))
            .await
            .map_err(|e| MediaError::Decode(e.to_string()))?
    }
}

/// `clip://` 片段按 mp3 处理
fn extension_of(uri: &str) -> Option<String> {
    if clip_key_from_uri(uri).is_some() {
        return Some("mp3".to_string());
    }
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

// ============================================================================
// 驱动任务
// ============================================================================

/// 媒体时钟
///
/// 位置 = 锚点位置 + 自锚点以来的墙钟时间 × 倍速
#[derive(Debug)]
struct Clock {
    anchor_position: f64,
    anchor_instant: Option<Instant>,
    rate: f64,
}

impl Clock {
    fn new() -> Self {
        Self {
            anchor_position: 0.0,
            anchor_instant: None,
            rate: 1.0,
        }
    }

    fn running(&self) -> bool {
        self.anchor_instant.is_some()
    }

    fn position(&self) -> f64 {
        match self.anchor_instant {
            Some(instant) => self.anchor_position + instant.elapsed().as_secs_f64() * self.rate,
            None => self.anchor_position,
        }
    }

    fn start(&mut self) {
        if self.anchor_instant.is_none() {
            self.anchor_instant = Some(Instant::now());
        }
    }

    fn halt(&mut self) {
        self.anchor_position = self.position();
        self.anchor_instant = None;
    }

    fn set_position(&mut self, position: f64) {
        self.anchor_position = position;
        if self.anchor_instant.is_some() {
            self.anchor_instant = Some(Instant::now());
        }
    }

    fn set_rate(&mut self, rate: f64) {
        let position = self.position();
        self.rate = rate;
        self.set_position(position);
    }
}

struct Loaded {
    token: LoadToken,
    result: Result<f64, MediaError>,
}

struct Driver {
    fetcher: Arc<Fetcher>,
    events: mpsc::UnboundedSender<MediaEvent>,
    interval: Duration,
    token: Option<LoadToken>,
    duration: Option<f64>,
    clock: Clock,
    /// 元数据就绪前收到的 play
    play_requested: bool,
    volume: f64,
}

impl Driver {
    fn new(
        fetcher: Arc<Fetcher>,
        events: mpsc::UnboundedSender<MediaEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            events,
            interval: interval.max(Duration::from_millis(10)),
            token: None,
            duration: None,
            clock: Clock::new(),
            play_requested: false,
            volume: 1.0,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let (loaded_tx, mut loaded_rx) = mpsc::unbounded_channel::<Loaded>();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!("Headless media driver started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.apply(command, &loaded_tx),
                    None => break,
                },
                Some(loaded) = loaded_rx.recv() => self.on_loaded(loaded),
                _ = ticker.tick(), if self.clock.running() => self.on_tick(),
            }
        }

        tracing::debug!("Headless media driver stopped");
    }

    fn emit(&self, kind: MediaEventKind) {
        if let Some(token) = self.token {
            let _ = self.events.send(MediaEvent::new(token, kind));
        }
    }

    fn apply(&mut self, command: Command, loaded_tx: &mpsc::UnboundedSender<Loaded>) {
        match command {
            Command::Load { token, uri } => {
                self.token = Some(token);
                self.duration = None;
                self.play_requested = false;
                self.clock = Clock {
                    rate: self.clock.rate,
                    ..Clock::new()
                };

                let fetcher = self.fetcher.clone();
                let loaded_tx = loaded_tx.clone();
                tokio::spawn(async move {
                    let result = fetcher.load(&uri).await;
                    if let Err(e) = &result {
                        tracing::warn!(uri = %uri, error = %e, "Media load failed");
                    }
                    let _ = loaded_tx.send(Loaded { token, result });
                });
            }
            Command::Play => match self.duration {
                Some(duration) => {
                    if self.clock.position() >= duration {
                        self.clock.set_position(0.0);
                    }
                    self.clock.start();
                }
                None => self.play_requested = true,
            },
            Command::Pause => {
                self.play_requested = false;
                self.clock.halt();
            }
            Command::Seek(position) => {
                let upper = self.duration.unwrap_or(0.0);
                self.clock.set_position(position.clamp(0.0, upper));
            }
            Command::Rate(rate) => {
                if rate.is_finite() && rate > 0.0 {
                    self.clock.set_rate(rate);
                }
            }
            Command::Volume(volume) => {
                self.volume = volume.clamp(0.0, 1.0);
                tracing::trace!(volume = self.volume, "Volume changed");
            }
            Command::Stop => {
                self.token = None;
                self.duration = None;
                self.play_requested = false;
                self.clock.halt();
                self.clock.set_position(0.0);
            }
        }
    }

    fn on_loaded(&mut self, loaded: Loaded) {
        if self.token != Some(loaded.token) {
            return;
        }

        match loaded.result {
            Ok(duration) => {
                self.duration = Some(duration);
                self.emit(MediaEventKind::MetadataReady { duration });
                if std::mem::take(&mut self.play_requested) {
                    self.clock.start();
                }
            }
            Err(e) => {
                self.emit(MediaEventKind::Error {
                    message: e.to_string(),
                });
                self.token = None;
            }
        }
    }

    fn on_tick(&mut self) {
        let Some(duration) = self.duration else {
            return;
        };

        let position = self.clock.position();
        if position >= duration {
            self.clock.halt();
            self.clock.set_position(duration);
            self.emit(MediaEventKind::TimeUpdate { position: duration });
            self.emit(MediaEventKind::ReachedEnd);
        } else {
            self.emit(MediaEventKind::TimeUpdate { position });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::metadata::tests::wav_bytes;
    use super::*;
    use crate::application::ports::ClipMetadata;
    use crate::infrastructure::memory::InMemoryClipStore;
    use tempfile::TempDir;

    fn element(
        dir: &TempDir,
        clips: Arc<InMemoryClipStore>,
    ) -> (HeadlessMediaElement, mpsc::UnboundedReceiver<MediaEvent>) {
        HeadlessMediaElement::spawn(
            HeadlessMediaElementConfig {
                locator: AssetLocator::new("/audio", dir.path(), "http://localhost:3000"),
                time_update_interval: Duration::from_millis(20),
                fetch_timeout: Duration::from_secs(1),
            },
            clips,
        )
        .unwrap()
    }

    async fn next_event(events: &mut mpsc::UnboundedReceiver<MediaEvent>) -> MediaEvent {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("/audio/hello.MP3").as_deref(), Some("mp3"));
        assert_eq!(extension_of("https://cdn/x.wav?sig=1").as_deref(), Some("wav"));
        assert_eq!(extension_of("clip://abc:alloy:tts-1:1.00").as_deref(), Some("mp3"));
    }

    #[tokio::test]
    async fn test_local_file_plays_to_end() {
        let dir = TempDir::new().unwrap();
        // 0.1 秒
        std::fs::write(dir.path().join("short.wav"), wav_bytes(8000, 800)).unwrap();
        let (mut element, mut events) = element(&dir, Arc::new(InMemoryClipStore::new(1024)));

        let token = LoadToken::new(1);
        element.load(token, "/audio/short.wav");
        element.play();

        let ready = next_event(&mut events).await;
        assert_eq!(ready.token, token);
        match ready.kind {
            MediaEventKind::MetadataReady { duration } => assert!((duration - 0.1).abs() < 1e-6),
            other => panic!("unexpected event {:?}", other),
        }

        loop {
            let event = next_event(&mut events).await;
            assert_eq!(event.token, token);
            if event.kind == MediaEventKind::ReachedEnd {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_clip_uri_is_read_from_store() {
        let dir = TempDir::new().unwrap();
        let clips = Arc::new(InMemoryClipStore::new(1024 * 1024));
        clips
            .put(
                "k",
                wav_bytes(8000, 8000),
                ClipMetadata {
                    text_hash: "h".to_string(),
                    voice: "alloy".to_string(),
                    model: "tts-1".to_string(),
                    speed: 1.0,
                    content_type: None,
                },
            )
            .await
            .unwrap();
        let (mut element, mut events) = element(&dir, clips);

        element.load(LoadToken::new(3), "clip://k");
        let event = next_event(&mut events).await;
        assert!(matches!(event.kind, MediaEventKind::MetadataReady { .. }));
    }

    #[tokio::test]
    async fn test_missing_resource_reports_error() {
        let dir = TempDir::new().unwrap();
        let (mut element, mut events) = element(&dir, Arc::new(InMemoryClipStore::new(1024)));

        element.load(LoadToken::new(7), "/audio/missing.mp3");
        let event = next_event(&mut events).await;
        assert_eq!(event.token, LoadToken::new(7));
        assert!(matches!(event.kind, MediaEventKind::Error { .. }));
    }

    #[tokio::test]
    async fn test_superseded_load_emits_nothing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.wav"), wav_bytes(8000, 800)).unwrap();
        let (mut element, mut events) = element(&dir, Arc::new(InMemoryClipStore::new(1024)));

        element.load(LoadToken::new(1), "/audio/missing.mp3");
        element.load(LoadToken::new(2), "/audio/a.wav");

        let event = next_event(&mut events).await;
        assert_eq!(event.token, LoadToken::new(2));
    }
}
