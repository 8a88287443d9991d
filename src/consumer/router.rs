//! (group_id, topic) → 消息处理器

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::AckHandle;

/// 消息处理能力
///
/// 确认时机由处理器决定；不确认的消息会在重新平衡或重启后被再次投递。
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, topic: &str, payload: &[u8], ack: AckHandle);

    /// 关闭时调用，用于落盘缓冲数据
    async fn close(&self) {}
}

/// 路由键：`{group_id}_{topic}`，同时用作审计字段中的操作者
pub fn handler_key(group_id: &str, topic: &str) -> String {
    format!("{}_{}", group_id, topic)
}

#[derive(Default, Clone)]
pub struct HandlerRouter {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl HandlerRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, group_id: &str, topic: &str, handler: Arc<dyn MessageHandler>) {
        self.handlers.insert(handler_key(group_id, topic), handler);
    }

    pub fn get(&self, group_id: &str, topic: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.get(&handler_key(group_id, topic)).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// 未注册的 (group, topic) 记录告警后直接确认，避免无限重投
    pub async fn dispatch(&self, group_id: &str, topic: &str, payload: &[u8], ack: AckHandle) {
        match self.get(group_id, topic) {
            Some(handler) => handler.handle(topic, payload, ack).await,
            None => {
                warn!(
                    group_id,
                    topic,
                    partition = ack.partition(),
                    offset = ack.offset(),
                    "No handler registered, acknowledging and dropping message"
                );
                ack.ack();
            }
        }
    }

    /// 依次关闭所有处理器
    pub async fn close_all(&self) {
        for handler in self.handlers.values() {
            handler.close().await;
        }
    }
}
