//! Shadowing - 跟读练习音频解析与播放编排
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Asset Context: 本地预渲染音频映射
//! - Audio Context: 解析请求与结果
//! - Playback Context: 播放会话与状态
//! - Preload Context: 预加载票据
//!
//! 应用层 (application/):
//! - Ports: 端口定义（AssetProbe, SpeechSynthesis, ClipStore, MediaElement）
//! - Services: AssetAvailabilityChecker, AudioResolver, PlaybackController
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: 资源探测、合成客户端、无头播放器
//! - Memory: 片段与票据内存实现
//! - Persistence: Sled 片段存储
//! - Worker: PreloadScheduler 后台预解析
//! - Events: 播放事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
