//! Audio Context - 音频解析限界上下文
//!
//! 职责:
//! - 解析请求（文本 + 音色参数）
//! - 解析结果（来源种类 + URI）

mod errors;
mod value_objects;

pub use errors::ResolutionError;
pub use value_objects::{
    ModelId, ResolutionOptions, ResolutionRequest, ResolvedAudio, SourceKind, VoiceId,
};
