//! In-Memory Ticket Store Implementation
//!
//! 预加载票据的内存状态: 按 id 存储，按解析参数 key 索引最新票据

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::domain::audio::ResolvedAudio;
use crate::domain::preload::{PreloadTicket, TicketStatus};

/// 内存票据存储
pub struct InMemoryTicketStore {
    /// ticket_id -> PreloadTicket
    tickets: DashMap<Uuid, PreloadTicket>,
    /// key -> 最新的 ticket_id
    latest_by_key: DashMap<String, Uuid>,
    /// 票据完成通知
    completed: Notify,
    /// 保留票据上限，0 表示不限制
    max_retained: usize,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// 超出上限时回收最早完成的票据；未完成的票据不回收
    pub fn with_capacity(max_retained: usize) -> Self {
        Self {
            tickets: DashMap::new(),
            latest_by_key: DashMap::new(),
            completed: Notify::new(),
            max_retained,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 登记新票据；同 key 的旧票据被取代并回收
    pub fn insert(&self, ticket: PreloadTicket) {
        let id = ticket.id;
        if let Some(previous) = self.latest_by_key.insert(ticket.key.clone(), id) {
            if self.tickets.remove(&previous).is_some() {
                tracing::debug!(ticket_id = %previous, "Preload ticket superseded");
            }
        }
        self.tickets.insert(id, ticket);
        self.enforce_capacity();
        // 被取代或回收票据的等待者需要醒来
        self.completed.notify_waiters();
    }

    fn enforce_capacity(&self) {
        if self.max_retained == 0 {
            return;
        }

        let excess = self.tickets.len().saturating_sub(self.max_retained);
        if excess == 0 {
            return;
        }

        let mut completed: Vec<_> = self
            .tickets
            .iter()
            .filter_map(|t| t.completed_at.map(|at| (at, t.id, t.key.clone())))
            .collect();
        completed.sort_by_key(|(at, _, _)| *at);

        for (_, id, key) in completed.into_iter().take(excess) {
            self.tickets.remove(&id);
            self.latest_by_key.remove_if(&key, |_, latest| *latest == id);
            tracing::debug!(ticket_id = %id, "Preload ticket evicted");
        }
    }

    pub fn get(&self, id: Uuid) -> Option<PreloadTicket> {
        self.tickets.get(&id).map(|t| t.clone())
    }

    pub fn set_loaded(&self, id: Uuid, resolved: ResolvedAudio) {
        if let Some(mut ticket) = self.tickets.get_mut(&id) {
            ticket.mark_loaded(resolved);
        }
        self.completed.notify_waiters();
    }

    pub fn set_failed(&self, id: Uuid, error: impl Into<String>) {
        if let Some(mut ticket) = self.tickets.get_mut(&id) {
            ticket.mark_failed(error);
        }
        self.completed.notify_waiters();
    }

    /// 取走某 key 最新的已完成票据
    ///
    /// 仍在解析中的票据不会被取走
    pub fn take(&self, key: &str) -> Option<PreloadTicket> {
        let id = *self.latest_by_key.get(key)?;
        let ready = self
            .tickets
            .get(&id)
            .map(|t| t.status.is_terminal())
            .unwrap_or(false);
        if !ready {
            return None;
        }

        self.latest_by_key.remove_if(key, |_, latest| *latest == id);
        self.tickets.remove(&id).map(|(_, ticket)| ticket)
    }

    /// 等待票据完成
    ///
    /// 票据不存在（已被取走或取代）时返回 None
    pub async fn wait(&self, id: Uuid) -> Option<PreloadTicket> {
        loop {
            let notified = self.completed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.tickets.get(&id) {
                None => return None,
                Some(ticket) if ticket.status.is_terminal() => return Some(ticket.clone()),
                Some(_) => {}
            }

            notified.await;
        }
    }

    /// 某状态的票据数
    pub fn count(&self, status: TicketStatus) -> usize {
        self.tickets.iter().filter(|t| t.status == status).count()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

impl Default for InMemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}
