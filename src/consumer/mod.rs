//! 消费组监管、路由与消息客户端

pub mod ack;
pub mod group;
pub mod kafka;
pub mod manager;
pub mod router;
pub mod session;

pub use ack::{AckHandle, Acknowledge};
pub use group::{ConsumerGroup, GroupState};
pub use kafka::KafkaSession;
pub use manager::ConsumerManager;
pub use router::{HandlerRouter, MessageHandler, handler_key};
pub use session::{Delivery, LogSession, SessionError};
