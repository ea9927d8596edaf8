//! Memory Layer - In-Memory State Management
//!
//! 合成片段与预加载票据的内存状态

mod clip_store;
mod ticket_store;

pub use clip_store::InMemoryClipStore;
pub use ticket_store::InMemoryTicketStore;
