use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::group::{ConsumerGroup, GroupState};
use super::router::HandlerRouter;

/// 消费组监管者：每个消费组一个可取消的任务
pub struct ConsumerManager {
    router: Arc<HandlerRouter>,
    groups: Vec<Arc<ConsumerGroup>>,
    cancel: CancellationToken,
    tasks: JoinSet<()>,
}

impl ConsumerManager {
    pub fn new(router: Arc<HandlerRouter>) -> Self {
        Self {
            router,
            groups: Vec::new(),
            cancel: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    pub fn router(&self) -> Arc<HandlerRouter> {
        self.router.clone()
    }

    pub fn add(&mut self, group: ConsumerGroup) -> Arc<ConsumerGroup> {
        let group = Arc::new(group);
        self.groups.push(group.clone());
        group
    }

    pub fn groups(&self) -> &[Arc<ConsumerGroup>] {
        &self.groups
    }

    pub fn start_all(&mut self) {
        for group in &self.groups {
            if group.state() != GroupState::Starting {
                continue;
            }
            let group = group.clone();
            let cancel = self.cancel.child_token();
            self.tasks.spawn(async move { group.run(cancel).await });
        }
        info!("Started {} consumer group(s)", self.groups.len());
    }

    /// 停止消费 → 关闭处理器（最终 flush）→ 提交 offset 并关闭连接
    ///
    /// 等待消费任务退出的时间受 `wait` 限制，超时后继续关闭流程。
    pub async fn shutdown(&mut self, wait: Duration) {
        info!("Closing all kafka consumers...");
        self.cancel.cancel();

        let drained = tokio::time::timeout(wait, async {
            while let Some(result) = self.tasks.join_next().await {
                if let Err(e) = result {
                    warn!("Consumer task ended abnormally: {}", e);
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!("Timed out after {:?} waiting for consumer groups to stop", wait);
            self.tasks.abort_all();
        }

        self.router.close_all().await;

        for group in &self.groups {
            group.session().close().await;
        }
        info!("All kafka consumers closed");
    }
}
