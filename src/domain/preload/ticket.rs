//! Preload Context - 票据
//!
//! 一次 submit 中的每条文本对应一张票据；票据被取用、被同 key 的新票据取代
//! 或超出保留上限后回收

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::audio::{ResolutionRequest, ResolvedAudio};

/// 票据状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Pending,
    Loaded,
    /// 仅在文本为空时出现
    Failed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Loaded => "loaded",
            TicketStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TicketStatus::Pending)
    }
}

/// 预加载票据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreloadTicket {
    pub id: Uuid,
    pub text: String,
    /// 解析参数 key（见 `ResolutionRequest::cache_key`），同 key 的新票据取代旧票据
    pub key: String,
    pub status: TicketStatus,
    pub resolved: Option<ResolvedAudio>,
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PreloadTicket {
    pub fn new(request: &ResolutionRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: request.text.clone(),
            key: request.cache_key(),
            status: TicketStatus::Pending,
            resolved: None,
            error: None,
            submitted_at: Utc::now(),
            completed_at: None,
        }
    }

    pub(crate) fn mark_loaded(&mut self, resolved: ResolvedAudio) {
        self.status = TicketStatus::Loaded;
        self.resolved = Some(resolved);
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = TicketStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}
