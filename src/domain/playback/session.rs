//! Playback Context - 播放会话
//!
//! 会话字段只由 PlaybackController 修改，外部只读

use uuid::Uuid;

use super::PlaybackState;
use crate::domain::audio::ResolvedAudio;

/// 播放会话
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub(crate) id: Uuid,
    pub(crate) state: PlaybackState,
    pub(crate) resource: Option<ResolvedAudio>,
    pub(crate) current_time: f64,
    pub(crate) duration: f64,
    pub(crate) rate: f64,
    pub(crate) volume: f64,
    pub(crate) loop_enabled: bool,
    pub(crate) error: Option<String>,
}

impl PlaybackSession {
    pub(crate) fn new(volume: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: PlaybackState::Idle,
            resource: None,
            current_time: 0.0,
            duration: 0.0,
            rate: 1.0,
            volume,
            loop_enabled: false,
            error: None,
        }
    }

    /// 绑定新资源并重置进度
    pub(crate) fn bind(&mut self, resource: ResolvedAudio) {
        self.resource = Some(resource);
        self.current_time = 0.0;
        self.duration = 0.0;
        self.error = None;
        self.state = PlaybackState::Loading;
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn resource(&self) -> Option<&ResolvedAudio> {
        self.resource.as_ref()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    /// 错误信息（仅 Errored 状态下有值）
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 播放进度 (0.0 - 1.0)
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
