//! Application Services - 用例编排
//!
//! - AssetAvailabilityChecker: 资源可用性检查（会话级缓存）
//! - AudioResolver: 分层回退解析
//! - PlaybackController: 播放状态机

mod availability;
mod playback;
mod resolver;

pub use availability::{AssetAvailabilityChecker, AvailabilityRecord};
pub use playback::{LoadOptions, PlaybackController};
pub use resolver::AudioResolver;
