//! Preload Scheduler - 后台预解析
//!
//! 为即将播放的文本提前调用 AudioResolver，结果以票据形式保存，
//! 票据之间互不阻塞，完成顺序不保证

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::application::services::AudioResolver;
use crate::domain::audio::ResolutionOptions;
use crate::domain::preload::{PreloadTicket, TicketStatus};
use crate::infrastructure::memory::InMemoryTicketStore;

/// Scheduler 配置
#[derive(Debug, Clone)]
pub struct PreloadSchedulerConfig {
    /// 最大并发解析数，0 表示不限制
    pub max_concurrent: usize,
    /// 保留票据上限（未取走的已完成票据按完成时间回收），0 表示不限制
    pub max_retained: usize,
}

impl Default for PreloadSchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            max_retained: 256,
        }
    }
}

/// 预加载调度器
pub struct PreloadScheduler {
    resolver: Arc<AudioResolver>,
    tickets: Arc<InMemoryTicketStore>,
    semaphore: Option<Arc<Semaphore>>,
}

impl PreloadScheduler {
    pub fn new(config: PreloadSchedulerConfig, resolver: Arc<AudioResolver>) -> Self {
        let semaphore = (config.max_concurrent > 0)
            .then(|| Arc::new(Semaphore::new(config.max_concurrent)));

        tracing::info!(
            max_concurrent = config.max_concurrent,
            max_retained = config.max_retained,
            "PreloadScheduler created"
        );

        Self {
            resolver,
            tickets: InMemoryTicketStore::with_capacity(config.max_retained).arc(),
            semaphore,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 提交一批文本，立即返回票据快照（不等待解析）
    ///
    /// 必须在 tokio 运行时内调用
    pub fn submit<S: AsRef<str>>(
        &self,
        texts: &[S],
        options: &ResolutionOptions,
    ) -> Vec<PreloadTicket> {
        let mut submitted = Vec::with_capacity(texts.len());
        let mut rejected = 0usize;

        for text in texts {
            let request = options.request(text.as_ref());
            let ticket = PreloadTicket::new(&request);
            let ticket_id = ticket.id;
            self.tickets.insert(ticket);

            if let Err(e) = request.validate() {
                self.tickets.set_failed(ticket_id, e.to_string());
                rejected += 1;
            } else {
                let resolver = self.resolver.clone();
                let tickets = self.tickets.clone();
                let semaphore = self.semaphore.clone();

                tokio::spawn(async move {
                    // 持有 permit 直到解析完成
                    let _permit = match semaphore {
                        Some(semaphore) => match semaphore.acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to acquire semaphore permit");
                                tickets.set_failed(ticket_id, e.to_string());
                                return;
                            }
                        },
                        None => None,
                    };

                    match resolver.resolve(&request).await {
                        Ok(resolved) => {
                            tracing::debug!(
                                ticket_id = %ticket_id,
                                source = %resolved.source_kind(),
                                "Preload ticket loaded"
                            );
                            tickets.set_loaded(ticket_id, resolved);
                        }
                        Err(e) => tickets.set_failed(ticket_id, e.to_string()),
                    }
                });
            }

            if let Some(ticket) = self.tickets.get(ticket_id) {
                submitted.push(ticket);
            }
        }

        tracing::info!(
            submitted = submitted.len(),
            rejected = rejected,
            "Preload batch submitted"
        );
        submitted
    }

    /// 票据当前快照
    pub fn ticket(&self, id: Uuid) -> Option<PreloadTicket> {
        self.tickets.get(id)
    }

    /// 取走某文本在给定解析参数下最新的已完成票据
    pub fn take(&self, text: &str, options: &ResolutionOptions) -> Option<PreloadTicket> {
        self.tickets.take(&options.request(text).cache_key())
    }

    /// 等待票据完成
    pub async fn wait(&self, id: Uuid) -> Option<PreloadTicket> {
        self.tickets.wait(id).await
    }

    /// 等待一批票据完成（结果顺序与输入一致）
    pub async fn wait_all(&self, ids: &[Uuid]) -> Vec<Option<PreloadTicket>> {
        join_all(ids.iter().map(|id| self.tickets.wait(*id))).await
    }

    /// 仍在解析中的票据数
    pub fn pending(&self) -> usize {
        self.tickets.count(TicketStatus::Pending)
    }
}
