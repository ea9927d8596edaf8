//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod events;
pub mod memory;
pub mod persistence;
pub mod worker;

pub use events::{EventPublisher, PlaybackEvent};
pub use memory::{InMemoryClipStore, InMemoryTicketStore};
pub use persistence::sled::SledClipStore;
pub use worker::{PreloadScheduler, PreloadSchedulerConfig};
