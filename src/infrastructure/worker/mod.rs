//! Worker Layer - Background Task Processing
//!
//! 实现 PreloadScheduler，后台预解析音频

mod preload_scheduler;

pub use preload_scheduler::{PreloadScheduler, PreloadSchedulerConfig};
