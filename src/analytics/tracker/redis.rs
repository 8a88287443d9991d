use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::debug;

use super::ProcessedEventTracker;
use crate::errors::{Result, StatsError};

/// Redis 追踪：`SET key 1 EX ttl` / `EXISTS key`，可跨实例共享
pub struct RedisTracker {
    client: redis::Client,
    /// 持久化连接，出错时重置
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
    ttl_secs: u64,
}

impl RedisTracker {
    pub fn new(url: &str, key_prefix: &str, ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| StatsError::tracker(format!("invalid redis url '{}': {}", url, e)))?;

        debug!(
            "RedisTracker created with prefix: '{}', TTL: {}s",
            key_prefix, ttl_secs
        );

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: key_prefix.to_string(),
            ttl_secs,
        })
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> std::result::Result<MultiplexedConnection, redis::RedisError> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    fn make_key(&self, event_id: &str) -> String {
        format!("{}{}", self.key_prefix, event_id)
    }
}

#[async_trait]
impl ProcessedEventTracker for RedisTracker {
    async fn is_processed(&self, event_id: &str) -> anyhow::Result<bool> {
        let mut conn = self.get_connection().await?;
        match conn.exists::<_, bool>(self.make_key(event_id)).await {
            Ok(exists) => Ok(exists),
            Err(e) => {
                self.reset_connection().await;
                Err(e.into())
            }
        }
    }

    async fn mark_processed(&self, event_id: &str) -> anyhow::Result<()> {
        let mut conn = self.get_connection().await?;
        match conn
            .set_ex::<_, _, ()>(self.make_key(event_id), 1, self.ttl_secs)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                self.reset_connection().await;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefix() {
        let tracker = RedisTracker::new("redis://127.0.0.1:6379/", "cs:", 60).unwrap();
        assert_eq!(tracker.make_key("e-1"), "cs:e-1");
    }

    #[test]
    fn test_invalid_url() {
        assert!(RedisTracker::new("not-a-url", "cs:", 60).is_err());
    }
}
