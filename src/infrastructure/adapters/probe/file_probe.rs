//! File Asset Probe - 基于文件系统元数据的探测

use async_trait::async_trait;
use tokio::fs;

use super::super::AssetLocator;
use crate::application::ports::AssetProbePort;

/// 文件探测器
///
/// 资源存在当且仅当对应路径是非空普通文件
pub struct FileAssetProbe {
    locator: AssetLocator,
}

impl FileAssetProbe {
    pub fn new(locator: AssetLocator) -> Self {
        Self { locator }
    }
}

#[async_trait]
impl AssetProbePort for FileAssetProbe {
    async fn exists(&self, uri: &str) -> bool {
        let Some(path) = self.locator.local_path(uri) else {
            return false;
        };

        match fs::metadata(&path).await {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(e) => {
                tracing::trace!(path = %path.display(), error = %e, "Asset stat failed");
                false
            }
        }
    }
}
