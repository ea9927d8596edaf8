//! Asset Probe Port - 本地资源存在性探测
//!
//! 仅探测元数据（HEAD 或文件 stat），不读取内容

use async_trait::async_trait;

/// Asset Probe Port
///
/// 任何错误（网络、权限、超时）都映射为 `false`，不抛出
#[async_trait]
pub trait AssetProbePort: Send + Sync {
    /// 资源是否可被服务
    async fn exists(&self, uri: &str) -> bool;
}
