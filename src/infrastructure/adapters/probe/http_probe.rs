//! HTTP Asset Probe - 通过 HEAD 请求探测
//!
//! 成功状态码视为存在；网络错误、超时与非 2xx 均视为不存在

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::super::AssetLocator;
use crate::application::ports::AssetProbePort;

/// HTTP 探测器
pub struct HttpAssetProbe {
    client: Client,
    locator: AssetLocator,
}

impl HttpAssetProbe {
    pub fn new(locator: AssetLocator, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, locator })
    }
}

#[async_trait]
impl AssetProbePort for HttpAssetProbe {
    async fn exists(&self, uri: &str) -> bool {
        let url = self.locator.http_url(uri);
        match self.client.head(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Asset HEAD request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_origin_is_unavailable() {
        let probe = HttpAssetProbe::new(
            AssetLocator::new("/audio", "public/audio", "http://127.0.0.1:9"),
            1,
        )
        .unwrap();
        assert!(!probe.exists("/audio/hello.mp3").await);
    }
}
