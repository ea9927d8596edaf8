//! Media Element Port - 底层媒体播放原语
//!
//! 控制器单向下发命令；媒体事件通过 `MediaEvent` 回传，
//! 并携带发起加载时的 `LoadToken`

use thiserror::Error;

use crate::domain::playback::LoadToken;

/// 媒体错误（解码 / 获取失败）
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MediaError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to fetch resource: {0}")]
    Fetch(String),

    #[error("Failed to decode resource: {0}")]
    Decode(String),
}

/// 媒体事件种类
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEventKind {
    /// 元数据就绪（时长，秒）
    MetadataReady { duration: f64 },
    /// 播放位置更新（秒）
    TimeUpdate { position: f64 },
    /// 播放到结尾
    ReachedEnd,
    /// 解码或获取失败
    Error { message: String },
}

/// 媒体事件
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    pub token: LoadToken,
    pub kind: MediaEventKind,
}

impl MediaEvent {
    pub fn new(token: LoadToken, kind: MediaEventKind) -> Self {
        Self { token, kind }
    }
}

/// Media Element Port
///
/// 一个实例只归属一个 PlaybackController
pub trait MediaElementPort: Send {
    /// 绑定新资源并开始获取元数据；之前的加载作废
    fn load(&mut self, token: LoadToken, uri: &str);

    fn play(&mut self);

    fn pause(&mut self);

    /// 设置播放位置（秒）
    fn seek(&mut self, position: f64);

    fn set_rate(&mut self, rate: f64);

    fn set_volume(&mut self, volume: f64);

    /// 停止播放并释放当前资源
    fn stop(&mut self);
}
