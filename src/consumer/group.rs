//! 单个消费组连接：状态机 + 分区消费循环
//!
//! `Starting → Consuming ⇄ Backoff → Stopped`

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use strum::{AsRefStr, Display};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::router::HandlerRouter;
use super::session::{LogSession, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupState {
    Starting,
    Consuming,
    Backoff,
    Stopped,
}

pub struct ConsumerGroup {
    group_id: String,
    topics: Vec<String>,
    backoff: Duration,
    session: Arc<dyn LogSession>,
    router: Arc<HandlerRouter>,
    state: Mutex<GroupState>,
}

impl ConsumerGroup {
    pub fn new(
        group_id: impl Into<String>,
        topics: Vec<String>,
        backoff: Duration,
        session: Arc<dyn LogSession>,
        router: Arc<HandlerRouter>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            topics,
            backoff,
            session,
            router,
            state: Mutex::new(GroupState::Starting),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn state(&self) -> GroupState {
        *self.state.lock()
    }

    pub fn session(&self) -> Arc<dyn LogSession> {
        self.session.clone()
    }

    fn set_state(&self, next: GroupState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!(group_id = %self.group_id, from = %*state, to = %next, "Consumer group state change");
            *state = next;
        }
    }

    /// 运行直到取消或连接关闭
    ///
    /// 消费出错时等待 backoff 后重新订阅；取消只在两条消息之间生效。
    pub async fn run(&self, cancel: CancellationToken) {
        info!(group_id = %self.group_id, topics = ?self.topics, "Consumer group starting");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = match self.session.subscribe(&self.topics).await {
                Ok(()) => {
                    self.set_state(GroupState::Consuming);
                    self.consume(&cancel).await
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => break,
                Err(SessionError::Closed) => {
                    info!(group_id = %self.group_id, "Consumer group closed");
                    break;
                }
                Err(SessionError::Transient(e)) => {
                    warn!(
                        group_id = %self.group_id,
                        "Failed to consume message: {}, retrying in {:?}",
                        e,
                        self.backoff
                    );
                    self.set_state(GroupState::Backoff);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.backoff) => {}
                    }
                }
            }
        }

        self.set_state(GroupState::Stopped);
        info!(group_id = %self.group_id, "Consumer group stopped");
    }

    async fn consume(&self, cancel: &CancellationToken) -> Result<(), SessionError> {
        loop {
            let delivery = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                delivery = self.session.recv() => delivery?,
            };

            self.router
                .dispatch(
                    &self.group_id,
                    &delivery.topic,
                    &delivery.payload,
                    delivery.ack,
                )
                .await;
        }
    }
}
