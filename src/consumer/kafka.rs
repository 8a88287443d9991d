//! rdkafka 实现的 `LogSession`
//!
//! 关闭 `enable.auto.offset.store`，只有被确认的消息才会写入 offset store；
//! `auto_commit` 关闭时每次确认后异步提交。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rdkafka::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::Message;
use tracing::{debug, info, warn};

use super::ack::{AckHandle, Acknowledge};
use super::session::{Delivery, LogSession, SessionError};
use crate::config::{GroupConfig, KafkaConfig};
use crate::errors::{Result, StatsError};

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// 每个 (topic, partition) 已确认的最大 offset，确认只能前进
type AckMarks = Arc<Mutex<HashMap<(String, i32), i64>>>;

pub struct KafkaSession {
    group_id: String,
    consumer: Arc<StreamConsumer>,
    marks: AckMarks,
    auto_commit: bool,
    closed: AtomicBool,
}

impl KafkaSession {
    /// 创建消费者并确认集群可达；失败即启动失败
    pub async fn connect(kafka: &KafkaConfig, group: &GroupConfig) -> Result<Self> {
        let consumer: StreamConsumer = client_config(kafka, group).create().map_err(|e| {
            StatsError::kafka_connection(format!(
                "failed to create consumer for group '{}': {}",
                group.group_id, e
            ))
        })?;
        let consumer = Arc::new(consumer);

        let client = consumer.clone();
        let brokers = tokio::task::spawn_blocking(move || {
            client
                .fetch_metadata(None, METADATA_TIMEOUT)
                .map(|m| m.brokers().len())
        })
        .await
        .map_err(|e| StatsError::kafka_connection(format!("metadata fetch aborted: {}", e)))?
        .map_err(|e| {
            StatsError::kafka_connection(format!(
                "cannot reach Kafka brokers {:?}: {}",
                kafka.brokers, e
            ))
        })?;

        info!(
            group_id = %group.group_id,
            brokers,
            "Kafka consumer connected"
        );

        Ok(Self {
            group_id: group.group_id.clone(),
            consumer,
            marks: Arc::new(Mutex::new(HashMap::new())),
            auto_commit: group.auto_commit,
            closed: AtomicBool::new(false),
        })
    }
}

/// 组装 librdkafka 配置
pub fn client_config(kafka: &KafkaConfig, group: &GroupConfig) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", kafka.brokers.join(","))
        .set("client.id", &kafka.client_id)
        .set("group.id", &group.group_id)
        .set("broker.version.fallback", &kafka.version)
        .set("fetch.max.bytes", group.fetch_max_bytes.to_string())
        .set("session.timeout.ms", group.session_timeout_ms.to_string())
        .set(
            "heartbeat.interval.ms",
            group.heartbeat_interval_ms().to_string(),
        )
        .set("enable.auto.commit", group.auto_commit.to_string())
        .set(
            "auto.commit.interval.ms",
            group.auto_commit_interval_ms.to_string(),
        )
        .set("enable.auto.offset.store", "false")
        .set("auto.offset.reset", group.auto_offset.as_ref());
    config
}

fn classify(err: KafkaError) -> SessionError {
    match err {
        KafkaError::Canceled => SessionError::Closed,
        e if e.rdkafka_error_code() == Some(RDKafkaErrorCode::Fatal) => SessionError::Closed,
        e => SessionError::Transient(e.to_string()),
    }
}

#[async_trait]
impl LogSession for KafkaSession {
    async fn subscribe(&self, topics: &[String]) -> std::result::Result<(), SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }
        let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
        self.consumer.subscribe(&topics).map_err(classify)
    }

    async fn recv(&self) -> std::result::Result<Delivery, SessionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Closed);
        }
        let msg = self.consumer.recv().await.map_err(classify)?;

        let topic = msg.topic().to_string();
        let partition = msg.partition();
        let offset = msg.offset();
        let payload = msg.payload().map(<[u8]>::to_vec).unwrap_or_default();

        let ack = AckHandle::new(
            Box::new(KafkaAck {
                consumer: self.consumer.clone(),
                marks: self.marks.clone(),
                topic: topic.clone(),
                partition,
                offset,
                auto_commit: self.auto_commit,
            }),
            partition,
            offset,
        );

        Ok(Delivery {
            topic,
            partition,
            offset,
            payload,
            ack,
        })
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if !self.auto_commit
            && let Err(e) = self.consumer.commit_consumer_state(CommitMode::Sync)
        {
            debug!(group_id = %self.group_id, "Final offset commit skipped: {}", e);
        }
        self.consumer.unsubscribe();
        info!(group_id = %self.group_id, "Kafka consumer closed");
    }
}

struct KafkaAck {
    consumer: Arc<StreamConsumer>,
    marks: AckMarks,
    topic: String,
    partition: i32,
    offset: i64,
    auto_commit: bool,
}

impl Acknowledge for KafkaAck {
    fn acknowledge(self: Box<Self>) {
        {
            let mut marks = self.marks.lock();
            let mark = marks
                .entry((self.topic.clone(), self.partition))
                .or_insert(-1);
            if self.offset <= *mark {
                return;
            }
            *mark = self.offset;
        }

        // 提交的是下一条待消费的 offset
        if let Err(e) = self
            .consumer
            .store_offset(&self.topic, self.partition, self.offset + 1)
        {
            warn!(
                topic = %self.topic,
                partition = self.partition,
                offset = self.offset,
                "Failed to store offset: {}",
                e
            );
            return;
        }

        if !self.auto_commit
            && let Err(e) = self.consumer.commit_consumer_state(CommitMode::Async)
        {
            debug!(
                topic = %self.topic,
                partition = self.partition,
                "Async offset commit failed: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HandlerKind, StaticConfig};

    #[test]
    fn test_client_config_values() {
        let config = StaticConfig::default();
        let group = GroupConfig {
            group_id: "stats-group-total".to_string(),
            ..GroupConfig::new(HandlerKind::Summary)
        };
        let client = client_config(&config.kafka, &group);

        assert_eq!(client.get("group.id"), Some("stats-group-total"));
        assert_eq!(client.get("bootstrap.servers"), Some("127.0.0.1:9092"));
        assert_eq!(client.get("heartbeat.interval.ms"), Some("3333"));
        assert_eq!(client.get("session.timeout.ms"), Some("10000"));
        assert_eq!(client.get("enable.auto.offset.store"), Some("false"));
        assert_eq!(client.get("enable.auto.commit"), Some("false"));
        assert_eq!(client.get("auto.offset.reset"), Some("earliest"));
        assert_eq!(client.get("broker.version.fallback"), Some("2.8.0"));
    }

    #[test]
    fn test_classify_errors() {
        assert_eq!(classify(KafkaError::Canceled), SessionError::Closed);
        assert!(matches!(
            classify(KafkaError::MessageConsumption(RDKafkaErrorCode::BrokerTransportFailure)),
            SessionError::Transient(_)
        ));
        assert_eq!(
            classify(KafkaError::MessageConsumption(RDKafkaErrorCode::Fatal)),
            SessionError::Closed
        );
    }
}
