//! 消息客户端接缝
//!
//! 消费循环只依赖 `LogSession`，Kafka 实现见 `kafka` 模块。

use async_trait::async_trait;

use super::AckHandle;

/// 一条投递的消息
#[derive(Debug)]
pub struct Delivery {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
    pub ack: AckHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// 可重试：退避后重新订阅
    Transient(String),
    /// 连接已关闭，终止该消费组
    Closed,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Transient(msg) => write!(f, "transient consume error: {}", msg),
            SessionError::Closed => write!(f, "consumer group closed"),
        }
    }
}

impl std::error::Error for SessionError {}

#[async_trait]
pub trait LogSession: Send + Sync {
    async fn subscribe(&self, topics: &[String]) -> Result<(), SessionError>;

    /// 按分区顺序返回下一条消息
    async fn recv(&self) -> Result<Delivery, SessionError>;

    /// 提交已确认的 offset 并离开消费组
    async fn close(&self);
}
