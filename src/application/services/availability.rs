//! Asset Availability Checker
//!
//! 探测结果按 AssetId 缓存，生命周期与检查器实例相同（无 TTL）

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::AssetProbePort;
use crate::domain::asset::AssetId;

/// 可用性记录
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRecord {
    pub asset_id: AssetId,
    pub checked_at: DateTime<Utc>,
    pub available: bool,
}

/// 资源可用性检查器
pub struct AssetAvailabilityChecker {
    probe: Arc<dyn AssetProbePort>,
    records: DashMap<AssetId, AvailabilityRecord>,
}

impl AssetAvailabilityChecker {
    pub fn new(probe: Arc<dyn AssetProbePort>) -> Self {
        Self {
            probe,
            records: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 检查资源是否可用
    ///
    /// 已有记录（无论正负）直接返回，不再探测
    pub async fn is_available(&self, asset: &AssetId, uri: &str) -> bool {
        if let Some(record) = self.records.get(asset) {
            return record.available;
        }

        let available = self.probe.exists(uri).await;
        self.records.insert(
            asset.clone(),
            AvailabilityRecord {
                asset_id: asset.clone(),
                checked_at: Utc::now(),
                available,
            },
        );

        tracing::debug!(asset = %asset, uri = %uri, available = available, "Asset probed");
        available
    }

    /// 获取已缓存的记录
    pub fn record(&self, asset: &AssetId) -> Option<AvailabilityRecord> {
        self.records.get(asset).map(|r| r.clone())
    }

    /// 已缓存的记录数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
