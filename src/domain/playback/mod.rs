//! Playback Context - 播放会话限界上下文
//!
//! 职责:
//! - 播放状态与会话数据
//! - 传输控制参数（倍速范围、音量、快进步长）

mod session;
mod settings;
mod state;

pub use session::PlaybackSession;
pub use settings::{PlaybackSettings, RateRange};
pub use state::{LoadToken, PlaybackState};
