//! Event Publisher Implementation
//!
//! 按播放会话划分的广播通道，供 UI 或日志订阅

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::playback::PlaybackState;

const CHANNEL_CAPACITY: usize = 100;

/// 播放事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PlaybackEvent {
    /// 状态变更
    StateChanged {
        session_id: Uuid,
        from: PlaybackState,
        to: PlaybackState,
    },
    /// 播放进度
    TimeUpdate {
        session_id: Uuid,
        current_time: f64,
        duration: f64,
    },
    /// 播放完成（非循环）
    Ended { session_id: Uuid },
    /// 媒体错误
    Error { session_id: Uuid, message: String },
}

impl PlaybackEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            PlaybackEvent::StateChanged { session_id, .. }
            | PlaybackEvent::TimeUpdate { session_id, .. }
            | PlaybackEvent::Ended { session_id }
            | PlaybackEvent::Error { session_id, .. } => *session_id,
        }
    }
}

/// 事件发布器
pub struct EventPublisher {
    /// session_id -> broadcast sender
    session_channels: DashMap<Uuid, broadcast::Sender<PlaybackEvent>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            session_channels: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 注册会话的事件通道
    pub fn register_session(&self, session_id: Uuid) -> broadcast::Receiver<PlaybackEvent> {
        if let Some(sender) = self.session_channels.get(&session_id) {
            return sender.subscribe();
        }

        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
        self.session_channels.insert(session_id, tx);
        rx
    }

    /// 取消注册会话
    pub fn unregister_session(&self, session_id: Uuid) {
        self.session_channels.remove(&session_id);
    }

    /// 获取会话的事件接收器
    pub fn subscribe(&self, session_id: Uuid) -> Option<broadcast::Receiver<PlaybackEvent>> {
        self.session_channels.get(&session_id).map(|s| s.subscribe())
    }

    /// 已注册会话数
    pub fn session_count(&self) -> usize {
        self.session_channels.len()
    }

    /// 发布状态变更事件
    pub fn publish_state_changed(&self, session_id: Uuid, from: PlaybackState, to: PlaybackState) {
        self.publish_to_session(PlaybackEvent::StateChanged {
            session_id,
            from,
            to,
        });
    }

    /// 发布进度事件
    pub fn publish_time_update(&self, session_id: Uuid, current_time: f64, duration: f64) {
        self.publish_to_session(PlaybackEvent::TimeUpdate {
            session_id,
            current_time,
            duration,
        });
    }

    /// 发布播放完成事件
    pub fn publish_ended(&self, session_id: Uuid) {
        self.publish_to_session(PlaybackEvent::Ended { session_id });
    }

    /// 发布媒体错误事件
    pub fn publish_error(&self, session_id: Uuid, message: &str) {
        self.publish_to_session(PlaybackEvent::Error {
            session_id,
            message: message.to_string(),
        });
    }

    fn publish_to_session(&self, event: PlaybackEvent) {
        let session_id = event.session_id();
        if let Some(sender) = self.session_channels.get(&session_id) {
            if let Err(e) = sender.send(event) {
                tracing::trace!(
                    session_id = %session_id,
                    error = %e,
                    "Failed to publish event (no receivers)"
                );
            }
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_session_subscribers_only() {
        let publisher = EventPublisher::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut rx_a = publisher.register_session(a);
        let mut rx_b = publisher.register_session(b);

        publisher.publish_ended(a);

        assert_eq!(rx_a.try_recv().unwrap(), PlaybackEvent::Ended { session_id: a });
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_unregistered_session_drops_events() {
        let publisher = EventPublisher::new();
        let id = Uuid::new_v4();
        publisher.register_session(id);
        publisher.unregister_session(id);

        publisher.publish_error(id, "boom");
        assert!(publisher.subscribe(id).is_none());
        assert_eq!(publisher.session_count(), 0);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let id = Uuid::nil();
        let json = serde_json::to_value(PlaybackEvent::StateChanged {
            session_id: id,
            from: PlaybackState::Ready,
            to: PlaybackState::Playing,
        })
        .unwrap();
        assert_eq!(json["event"], "StateChanged");
        assert_eq!(json["data"]["to"], "playing");
    }
}
