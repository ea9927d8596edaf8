//! Probe Adapter - 资源存在性探测实现

mod file_probe;
mod http_probe;

pub use file_probe::FileAssetProbe;
pub use http_probe::HttpAssetProbe;
