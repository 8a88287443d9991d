//! 聚合处理器
//!
//! 点击事件按 (short_code, 日期) 累加到内存缓冲区，达到 batch_size 或定时触发时
//! 在一个事务内批量 upsert；消息在数据落盘后才确认。
//!
//! - 刷盘只在快照时持有缓冲区锁，I/O 在锁外进行
//! - 刷盘失败的消息带着重试计数放回缓冲区，第 3 次失败后丢弃并确认；
//!   放回的消息不计入 batch_size 阈值
//! - 刷盘成功后尽力标记幂等记录，标记失败也照常确认

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::message::{ClickEventMessage, EventEnvelope};
use super::schedule::FlushSchedule;
use super::sink::SummaryRecorder;
use super::tracker::ProcessedEventTracker;
use super::{AggregationKey, SHORT_CODE_MAX_LEN};
use crate::consumer::{AckHandle, MessageHandler};

/// 刷盘失败上限，达到后丢弃
pub const MAX_FLUSH_ATTEMPTS: u32 = 3;
/// 单次刷盘事务超时
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(60);
/// 关闭时等待进行中刷盘的上限
pub const CLOSE_WAIT: Duration = Duration::from_secs(30);

pub struct AggregatorOptions {
    pub batch_size: usize,
    pub schedule: FlushSchedule,
    pub flush_timeout: Duration,
    pub close_wait: Duration,
}

impl AggregatorOptions {
    pub fn new(batch_size: usize, schedule: FlushSchedule) -> Self {
        Self {
            batch_size,
            schedule,
            flush_timeout: FLUSH_TIMEOUT,
            close_wait: CLOSE_WAIT,
        }
    }
}

/// 等待落盘的消息
struct PendingMessage {
    event_id: String,
    key: AggregationKey,
    ack: AckHandle,
    attempts: u32,
}

#[derive(Default)]
struct Buffer {
    buckets: HashMap<AggregationKey, i64>,
    pending: Vec<PendingMessage>,
    /// 上次快照后新到达的消息数
    fresh: usize,
}

impl Buffer {
    /// 返回新到达的消息数，用于 batch_size 判断
    fn push(&mut self, message: PendingMessage) -> usize {
        *self.buckets.entry(message.key.clone()).or_insert(0) += 1;
        if message.attempts == 0 {
            self.fresh += 1;
        }
        self.pending.push(message);
        self.fresh
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.buckets.is_empty()
    }
}

/// 一次刷盘的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// 缓冲区为空，未调用写入
    Empty,
    /// 写入成功并确认了 `acked` 条消息
    Flushed { rows: usize, acked: usize },
    /// 写入失败：`requeued` 条放回缓冲区，`dropped` 条达到上限后丢弃
    Failed { requeued: usize, dropped: usize },
}

struct Inner {
    handler_key: String,
    batch_size: usize,
    flush_timeout: Duration,
    buffer: Mutex<Buffer>,
    /// 刷盘锁，防止并发刷盘
    flush_lock: tokio::sync::Mutex<()>,
    tracker: Arc<dyn ProcessedEventTracker>,
    recorder: Arc<dyn SummaryRecorder>,
}

impl Inner {
    async fn flush(&self) -> FlushOutcome {
        let guard = self.flush_lock.lock().await;
        self.flush_locked(guard).await
    }

    /// 调用方已持有刷盘锁
    async fn flush_locked(&self, _guard: tokio::sync::MutexGuard<'_, ()>) -> FlushOutcome {
        let snapshot = {
            let mut buffer = self.buffer.lock();
            if buffer.is_empty() {
                trace!("[{}] No clicks to flush", self.handler_key);
                return FlushOutcome::Empty;
            }
            std::mem::take(&mut *buffer)
        };

        let result = tokio::time::timeout(
            self.flush_timeout,
            self.recorder
                .record_summary(&self.handler_key, &snapshot.buckets),
        )
        .await
        .unwrap_or_else(|_| {
            Err(anyhow::anyhow!(
                "summary write timed out after {:?}",
                self.flush_timeout
            ))
        });

        match result {
            Ok(()) => self.on_flushed(snapshot).await,
            Err(e) => self.on_failed(snapshot.pending, e),
        }
    }

    async fn on_flushed(&self, snapshot: Buffer) -> FlushOutcome {
        let rows = snapshot.buckets.len();
        let acked = snapshot.pending.len();

        for message in snapshot.pending {
            if let Err(e) = self.tracker.mark_processed(&message.event_id).await {
                warn!(
                    handler = %self.handler_key,
                    event_id = %message.event_id,
                    "Failed to mark event processed, acknowledging anyway: {}",
                    e
                );
            }
            message.ack.ack();
        }

        debug!(
            "[{}] Flushed {} summary rows, {} messages acknowledged",
            self.handler_key, rows, acked
        );
        FlushOutcome::Flushed { rows, acked }
    }

    fn on_failed(&self, pending: Vec<PendingMessage>, err: anyhow::Error) -> FlushOutcome {
        let mut requeue = Vec::new();
        let mut dropped = 0;

        for mut message in pending {
            message.attempts += 1;
            if message.attempts >= MAX_FLUSH_ATTEMPTS {
                error!(
                    handler = %self.handler_key,
                    event_id = %message.event_id,
                    short_code = %message.key.short_code,
                    stat_date = %message.key.stat_date,
                    attempts = message.attempts,
                    "Dropping click after repeated flush failures"
                );
                message.ack.ack();
                dropped += 1;
            } else {
                requeue.push(message);
            }
        }

        let requeued = requeue.len();
        {
            let mut buffer = self.buffer.lock();
            for message in requeue {
                buffer.push(message);
            }
        }

        warn!(
            "[{}] Summary flush failed: {}, {} messages restored to buffer, {} dropped",
            self.handler_key, err, requeued, dropped
        );
        FlushOutcome::Failed { requeued, dropped }
    }
}

/// 聚合写入 click_stats_summary 的消息处理器
pub struct AggregatingHandler {
    inner: Arc<Inner>,
    close_wait: Duration,
    scheduler: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl AggregatingHandler {
    /// 创建处理器并启动定时刷盘任务
    pub fn new(
        handler_key: impl Into<String>,
        options: AggregatorOptions,
        tracker: Arc<dyn ProcessedEventTracker>,
        recorder: Arc<dyn SummaryRecorder>,
    ) -> Self {
        let inner = Arc::new(Inner {
            handler_key: handler_key.into(),
            batch_size: options.batch_size.max(1),
            flush_timeout: options.flush_timeout,
            buffer: Mutex::new(Buffer::default()),
            flush_lock: tokio::sync::Mutex::new(()),
            tracker,
            recorder,
        });

        let cancel = CancellationToken::new();
        let task = Self::start_scheduler(inner.clone(), options.schedule, cancel.clone());

        Self {
            inner,
            close_wait: options.close_wait,
            scheduler: Mutex::new(Some((cancel, task))),
        }
    }

    fn start_scheduler(
        inner: Arc<Inner>,
        schedule: FlushSchedule,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let Some(delay) = schedule.next_delay(Utc::now()) else {
                    warn!("[{}] Flush schedule has no further runs", inner.handler_key);
                    break;
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {
                        let has_data = !inner.buffer.lock().is_empty();
                        if has_data {
                            inner.flush().await;
                        }
                    }
                }
            }
            debug!("[{}] Flush scheduler stopped", inner.handler_key);
        })
    }

    pub fn handler_key(&self) -> &str {
        &self.inner.handler_key
    }

    /// 手动刷盘
    pub async fn flush(&self) -> FlushOutcome {
        self.inner.flush().await
    }

    /// 缓冲区中等待确认的消息数
    pub fn pending_count(&self) -> usize {
        self.inner.buffer.lock().pending.len()
    }

    /// 缓冲区中某个键的增量
    pub fn buffered_delta(&self, key: &AggregationKey) -> i64 {
        self.inner
            .buffer
            .lock()
            .buckets
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageHandler for AggregatingHandler {
    async fn handle(&self, topic: &str, payload: &[u8], ack: AckHandle) {
        let inner = &self.inner;

        let envelope = match EventEnvelope::parse(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    handler = %inner.handler_key,
                    topic,
                    offset = ack.offset(),
                    "Malformed event envelope, dropping: {}",
                    e
                );
                ack.ack();
                return;
            }
        };

        match inner.tracker.is_processed(&envelope.event_id).await {
            Ok(false) => {}
            Ok(true) => {
                debug!(
                    handler = %inner.handler_key,
                    event_id = %envelope.event_id,
                    "Event already processed, skipping"
                );
                ack.ack();
                return;
            }
            Err(e) => {
                // 不确认，等待重新投递
                warn!(
                    handler = %inner.handler_key,
                    event_id = %envelope.event_id,
                    "Idempotency check failed, leaving message unacknowledged: {}",
                    e
                );
                return;
            }
        }

        let mut message = match ClickEventMessage::parse(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    handler = %inner.handler_key,
                    event_id = %envelope.event_id,
                    "Malformed click payload, dropping: {}",
                    e
                );
                ack.ack();
                return;
            }
        };
        if message.short_code.chars().count() > SHORT_CODE_MAX_LEN {
            warn!(
                handler = %inner.handler_key,
                event_id = %envelope.event_id,
                short_code = %message.short_code,
                "Short code exceeds {} characters, dropping",
                SHORT_CODE_MAX_LEN
            );
            ack.ack();
            return;
        }
        message.default_click_time(Utc::now());

        let fresh = {
            let mut buffer = inner.buffer.lock();
            buffer.push(PendingMessage {
                event_id: envelope.event_id,
                key: AggregationKey::from_click(&message),
                ack,
                attempts: 0,
            })
        };

        if fresh >= inner.batch_size {
            trace!(
                "[{}] Batch size {} reached, flushing",
                inner.handler_key, inner.batch_size
            );
            inner.flush().await;
        }
    }

    /// 停止定时任务 → 有限等待进行中的刷盘 → 最终刷盘
    ///
    /// 整个过程共用一个 `close_wait` 期限。
    async fn close(&self) {
        let deadline = tokio::time::Instant::now() + self.close_wait;

        let scheduler = self.scheduler.lock().take();
        if let Some((cancel, task)) = scheduler {
            cancel.cancel();
            if tokio::time::timeout_at(deadline, task).await.is_err() {
                warn!(
                    "[{}] Flush scheduler did not stop within {:?}",
                    self.inner.handler_key, self.close_wait
                );
            }
        }

        // 超时后放弃最终刷盘，缓冲区中的消息保持未确认
        match tokio::time::timeout_at(deadline, self.inner.flush_lock.lock()).await {
            Ok(guard) => {
                let outcome = self.inner.flush_locked(guard).await;
                info!("[{}] Final flush: {:?}", self.inner.handler_key, outcome);
            }
            Err(_) => {
                warn!(
                    "[{}] Timed out after {:?} waiting for in-flight flush, {} messages left unacknowledged",
                    self.inner.handler_key,
                    self.close_wait,
                    self.pending_count()
                );
            }
        }
    }
}
