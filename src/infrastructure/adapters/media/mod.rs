//! Media Adapter - 无头媒体播放原语

mod headless_media_element;
mod metadata;

pub use headless_media_element::{HeadlessMediaElement, HeadlessMediaElementConfig};
pub use metadata::probe_duration;
