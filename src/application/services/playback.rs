//! Playback Controller - 播放状态机
//!
//! 状态转移:
//! - Idle --load--> Loading --metadata--> Ready --play--> Playing <--pause/play--> Paused
//! - Playing --end(loop=false)--> Ended ; Playing --end(loop=true)--> Playing（回到 0）
//! - 任意非 Idle 状态 --load--> Loading（先停止当前播放）
//! - Loading --media error--> Errored ; Errored 只能通过 load 离开
//!
//! 每次 load 生成新的 LoadToken，令牌不匹配的媒体事件直接丢弃。

use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{MediaElementPort, MediaEvent, MediaEventKind};
use crate::domain::audio::ResolvedAudio;
use crate::domain::playback::{LoadToken, PlaybackSession, PlaybackSettings, PlaybackState};
use crate::infrastructure::events::EventPublisher;

/// 加载选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// 元数据就绪后自动播放
    pub auto_play: bool,
}

impl LoadOptions {
    pub fn auto_play() -> Self {
        Self { auto_play: true }
    }
}

type EndedCallback = Box<dyn FnMut(Uuid) + Send>;

/// 播放控制器
///
/// 独占一个 PlaybackSession 和一个底层媒体原语
pub struct PlaybackController {
    session: PlaybackSession,
    media: Box<dyn MediaElementPort>,
    settings: PlaybackSettings,
    publisher: Arc<EventPublisher>,
    last_token: LoadToken,
    current_token: Option<LoadToken>,
    /// Loading 期间收到的 play()，Ready 时执行
    queued_play: bool,
    on_ended: Option<EndedCallback>,
}

impl PlaybackController {
    pub fn new(
        media: Box<dyn MediaElementPort>,
        settings: PlaybackSettings,
        publisher: Arc<EventPublisher>,
    ) -> Self {
        let volume = settings.default_volume.clamp(0.0, 1.0);
        let session = PlaybackSession::new(volume);
        publisher.register_session(session.id());

        tracing::debug!(session_id = %session.id(), "Playback session created");

        Self {
            session,
            media,
            settings,
            publisher,
            last_token: LoadToken::new(0),
            current_token: None,
            queued_play: false,
            on_ended: None,
        }
    }

    /// 设置播放完成回调（每次非循环播放结束调用一次）
    pub fn set_on_ended(&mut self, callback: impl FnMut(Uuid) + Send + 'static) {
        self.on_ended = Some(Box::new(callback));
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id()
    }

    pub fn state(&self) -> PlaybackState {
        self.session.state()
    }

    /// 当前有效的加载令牌
    pub fn current_token(&self) -> Option<LoadToken> {
        self.current_token
    }

    /// 是否有排队等待 Ready 的 play
    pub fn play_queued(&self) -> bool {
        self.queued_play
    }

    // ========================================================================
    // 传输控制
    // ========================================================================

    /// 加载新资源（任何状态均可），返回新的加载令牌
    pub fn load(&mut self, resource: ResolvedAudio, options: LoadOptions) -> LoadToken {
        let token = self.reserve_load();
        self.bind(token, resource, options);
        token
    }

    /// 预留加载令牌
    ///
    /// 用于先异步解析、后加载的场景: 解析完成时用 `load_reserved` 提交，
    /// 期间若有新的 load/reserve 发生，该令牌即过期
    pub fn reserve_load(&mut self) -> LoadToken {
        let token = self.last_token.next();
        self.last_token = token;
        token
    }

    /// 用预留令牌加载，令牌已过期时丢弃资源并返回 false
    pub fn load_reserved(
        &mut self,
        token: LoadToken,
        resource: ResolvedAudio,
        options: LoadOptions,
    ) -> bool {
        if token != self.last_token {
            tracing::debug!(
                session_id = %self.session.id,
                token = %token,
                latest = %self.last_token,
                uri = %resource.uri(),
                "Discarding stale resolution"
            );
            return false;
        }
        self.bind(token, resource, options);
        true
    }

    fn bind(&mut self, token: LoadToken, resource: ResolvedAudio, options: LoadOptions) {
        if self.session.state != PlaybackState::Idle {
            self.media.stop();
        }

        self.current_token = Some(token);
        self.queued_play = options.auto_play;

        tracing::debug!(
            session_id = %self.session.id,
            token = %token,
            source = %resource.source_kind(),
            uri = %resource.uri(),
            "Loading resource"
        );

        let uri = resource.uri().to_string();
        self.session.bind(resource);
        self.media.load(token, &uri);
        self.media.set_rate(self.session.rate);
        self.media.set_volume(self.session.volume);
        self.publish_state(PlaybackState::Loading);
    }

    /// 播放
    ///
    /// Loading 时排队；Ended 时从头重播
    pub fn play(&mut self) {
        match self.session.state {
            PlaybackState::Loading => {
                self.queued_play = true;
            }
            PlaybackState::Ready | PlaybackState::Paused => {
                self.media.play();
                self.transition(PlaybackState::Playing);
            }
            PlaybackState::Ended => {
                self.session.current_time = 0.0;
                self.media.seek(0.0);
                self.media.play();
                self.transition(PlaybackState::Playing);
            }
            PlaybackState::Idle | PlaybackState::Playing | PlaybackState::Errored => {}
        }
    }

    /// 暂停
    ///
    /// Loading 时取消排队的 play
    pub fn pause(&mut self) {
        match self.session.state {
            PlaybackState::Loading => {
                self.queued_play = false;
            }
            PlaybackState::Playing => {
                self.media.pause();
                self.transition(PlaybackState::Paused);
            }
            _ => {}
        }
    }

    /// 停止: 暂停并回到开头
    pub fn stop(&mut self) {
        match self.session.state {
            PlaybackState::Loading => {
                self.queued_play = false;
            }
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Paused => {
                self.media.pause();
                self.media.seek(0.0);
                self.session.current_time = 0.0;
                self.publish_time();
                if self.session.state == PlaybackState::Playing {
                    self.transition(PlaybackState::Paused);
                }
            }
            PlaybackState::Idle | PlaybackState::Ended | PlaybackState::Errored => {}
        }
    }

    /// 跳转（钳制到 [0, duration]），返回生效位置
    pub fn seek(&mut self, position: f64) -> f64 {
        if !self.session.state.is_seekable() || !position.is_finite() {
            return self.session.current_time;
        }

        let position = position.clamp(0.0, self.session.duration);
        self.media.seek(position);
        self.session.current_time = position;
        self.publish_time();
        position
    }

    /// 快进
    pub fn skip_forward(&mut self) -> f64 {
        self.seek(self.session.current_time + self.settings.skip_secs)
    }

    /// 快退
    pub fn skip_backward(&mut self) -> f64 {
        self.seek(self.session.current_time - self.settings.skip_secs)
    }

    /// 设置倍速（钳制到配置范围），返回生效倍速
    ///
    /// 设置跨 load 保留
    pub fn set_rate(&mut self, rate: f64) -> f64 {
        if !rate.is_finite() {
            return self.session.rate;
        }

        let rate = self.settings.rate_range.clamp(rate);
        self.session.rate = rate;
        self.media.set_rate(rate);
        tracing::debug!(session_id = %self.session.id, rate = rate, "Playback rate changed");
        rate
    }

    /// 设置音量（钳制到 [0, 1]），返回生效音量
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        if !volume.is_finite() {
            return self.session.volume;
        }

        let volume = volume.clamp(0.0, 1.0);
        self.session.volume = volume;
        self.media.set_volume(volume);
        volume
    }

    /// 设置循环播放
    pub fn set_loop(&mut self, enabled: bool) {
        self.session.loop_enabled = enabled;
    }

    // ========================================================================
    // 媒体事件
    // ========================================================================

    /// 处理底层媒体事件，返回事件是否被应用
    ///
    /// 令牌过期的事件（来自已被替换的资源）不改变任何状态
    pub fn handle_media_event(&mut self, event: MediaEvent) -> bool {
        if self.current_token != Some(event.token) {
            tracing::debug!(
                session_id = %self.session.id,
                token = %event.token,
                current = ?self.current_token,
                "Discarding stale media event"
            );
            return false;
        }

        match event.kind {
            MediaEventKind::MetadataReady { duration } => self.on_metadata_ready(duration),
            MediaEventKind::TimeUpdate { position } => self.on_time_update(position),
            MediaEventKind::ReachedEnd => self.on_reached_end(),
            MediaEventKind::Error { message } => self.on_media_error(message),
        }
    }

    fn on_metadata_ready(&mut self, duration: f64) -> bool {
        if self.session.state != PlaybackState::Loading {
            return false;
        }

        self.session.duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self.transition(PlaybackState::Ready);

        if std::mem::take(&mut self.queued_play) {
            self.play();
        }
        true
    }

    fn on_time_update(&mut self, position: f64) -> bool {
        if self.session.state != PlaybackState::Playing || !position.is_finite() {
            return false;
        }

        self.session.current_time = position.clamp(0.0, self.session.duration);
        self.publish_time();
        true
    }

    fn on_reached_end(&mut self) -> bool {
        if self.session.state != PlaybackState::Playing {
            return false;
        }

        if self.session.loop_enabled {
            self.session.current_time = 0.0;
            self.media.seek(0.0);
            self.media.play();
            self.publish_time();
            return true;
        }

        self.session.current_time = 0.0;
        self.transition(PlaybackState::Ended);
        self.publisher.publish_ended(self.session.id);
        if let Some(callback) = self.on_ended.as_mut() {
            callback(self.session.id);
        }
        true
    }

    fn on_media_error(&mut self, message: String) -> bool {
        if matches!(self.session.state, PlaybackState::Idle | PlaybackState::Errored) {
            return false;
        }

        tracing::warn!(
            session_id = %self.session.id,
            error = %message,
            "Media error, playback halted"
        );

        self.queued_play = false;
        self.media.stop();
        self.session.error = Some(message.clone());
        self.transition(PlaybackState::Errored);
        self.publisher.publish_error(self.session.id, &message);
        true
    }

    // ========================================================================
    // 内部
    // ========================================================================

    fn transition(&mut self, next: PlaybackState) {
        let previous = self.session.state;
        if previous == next {
            return;
        }
        self.session.state = next;
        tracing::debug!(
            session_id = %self.session.id,
            from = %previous,
            to = %next,
            "Playback state changed"
        );
        self.publisher.publish_state_changed(self.session.id, previous, next);
    }

    /// load 总是发布状态事件（即便 Loading -> Loading）
    fn publish_state(&mut self, next: PlaybackState) {
        let previous = self.session.state;
        self.session.state = next;
        self.publisher.publish_state_changed(self.session.id, previous, next);
    }

    fn publish_time(&self) {
        self.publisher
            .publish_time_update(self.session.id, self.session.current_time, self.session.duration);
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.media.stop();
        self.publisher.unregister_session(self.session.id);
        tracing::debug!(session_id = %self.session.id, "Playback session released");
    }
}
