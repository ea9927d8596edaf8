//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（AssetProbe、SpeechSynthesis、ClipStore、MediaElement）
//! - services: 资源可用性检查、分层解析、播放状态机

pub mod ports;
pub mod services;

// Re-exports
pub use ports::{
    // Asset probe
    AssetProbePort,
    // Clip store
    clip_key,
    ClipMetadata,
    ClipStoreError,
    ClipStorePort,
    ClipStoreStats,
    // Media element
    MediaElementPort,
    MediaError,
    MediaEvent,
    MediaEventKind,
    // Speech synthesis
    SpeechSynthesisPort,
    SynthesisError,
    SynthesisRequest,
    SynthesizedAudio,
};

pub use services::{
    AssetAvailabilityChecker, AudioResolver, AvailabilityRecord, LoadOptions, PlaybackController,
};
