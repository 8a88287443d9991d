use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::trace;

use super::ProcessedEventTracker;

/// 单进程内存追踪（moka TTL 缓存）
pub struct MemoryTracker {
    inner: Cache<String, ()>,
}

impl MemoryTracker {
    pub fn new(max_capacity: u64, ttl_secs: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        trace!(
            "MemoryTracker initialized: max_capacity={}, ttl={}s",
            max_capacity, ttl_secs
        );

        Self { inner }
    }
}

#[async_trait]
impl ProcessedEventTracker for MemoryTracker {
    async fn is_processed(&self, event_id: &str) -> anyhow::Result<bool> {
        Ok(self.inner.contains_key(event_id))
    }

    async fn mark_processed(&self, event_id: &str) -> anyhow::Result<()> {
        self.inner.insert(event_id.to_string(), ()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_and_check() {
        let tracker = MemoryTracker::new(1000, 60);

        assert!(!tracker.is_processed("e-1").await.unwrap());

        tracker.mark_processed("e-1").await.unwrap();
        assert!(tracker.is_processed("e-1").await.unwrap());

        // 其他事件不受影响
        assert!(!tracker.is_processed("e-2").await.unwrap());
    }
}
