//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod asset_probe;
mod clip_store;
mod media_element;
mod speech_synthesis;

pub use asset_probe::AssetProbePort;
pub use clip_store::{
    clip_key, clip_key_from_uri, clip_uri, ClipMetadata, ClipStoreError, ClipStorePort,
    ClipStoreStats, CLIP_URI_SCHEME,
};
pub use media_element::{MediaElementPort, MediaError, MediaEvent, MediaEventKind};
pub use speech_synthesis::{
    SpeechSynthesisPort, SynthesisError, SynthesisRequest, SynthesizedAudio,
};
