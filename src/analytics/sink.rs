use std::collections::HashMap;

use super::{AggregationKey, ClickRecord};

/// 汇总写入（聚合模式）
///
/// 一次调用内的所有增量要么全部持久化，要么全部不生效。
#[async_trait::async_trait]
pub trait SummaryRecorder: Send + Sync {
    async fn record_summary(
        &self,
        handler_key: &str,
        deltas: &HashMap<AggregationKey, i64>,
    ) -> anyhow::Result<()>;
}

/// 明细写入（逐条模式）
#[async_trait::async_trait]
pub trait ClickRecorder: Send + Sync {
    async fn record_click(&self, record: &ClickRecord) -> anyhow::Result<()>;
}
