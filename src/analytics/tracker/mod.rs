//! 幂等追踪：事件是否已被持久聚合
//!
//! 默认实现 `NoopTracker` 永远返回未处理，即不去重。

mod memory;
mod redis;

use std::sync::Arc;

use async_trait::async_trait;

pub use self::memory::MemoryTracker;
pub use self::redis::RedisTracker;

use crate::config::{TrackerConfig, TrackerType};
use crate::errors::Result;

#[async_trait]
pub trait ProcessedEventTracker: Send + Sync {
    async fn is_processed(&self, event_id: &str) -> anyhow::Result<bool>;
    async fn mark_processed(&self, event_id: &str) -> anyhow::Result<()>;
}

/// 不做任何记录
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

#[async_trait]
impl ProcessedEventTracker for NoopTracker {
    async fn is_processed(&self, _event_id: &str) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn mark_processed(&self, _event_id: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 按配置创建追踪器
pub fn build_tracker(config: &TrackerConfig) -> Result<Arc<dyn ProcessedEventTracker>> {
    let tracker: Arc<dyn ProcessedEventTracker> = match config.tracker_type {
        TrackerType::None => Arc::new(NoopTracker),
        TrackerType::Memory => Arc::new(MemoryTracker::new(config.max_capacity, config.ttl_secs)),
        TrackerType::Redis => Arc::new(RedisTracker::new(
            &config.redis_url,
            &config.key_prefix,
            config.ttl_secs,
        )?),
    };
    Ok(tracker)
}
