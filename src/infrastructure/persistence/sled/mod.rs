//! Sled Storage - 嵌入式 KV 存储实现

mod clip_store;

pub use clip_store::{SledClipStore, SledClipStoreConfig};
