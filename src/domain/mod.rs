//! Domain Layer - 领域层
//!
//! 包含四个限界上下文:
//! - Asset Context: 本地预渲染音频资源映射
//! - Audio Context: 文本 → 可播放音频的解析请求与结果
//! - Playback Context: 播放会话状态机
//! - Preload Context: 预加载票据

pub mod asset;
pub mod audio;
pub mod playback;
pub mod preload;
