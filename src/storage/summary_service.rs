use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::debug;

use super::summary_writer::{self, SummaryDelta};
use crate::analytics::{AggregationKey, SummaryRecorder};
use crate::idgen::IdGenerator;

/// 单条 upsert 语句的最大行数
pub const SUB_BATCH_SIZE: usize = 100;

/// 汇总写入服务：增量转换为行，分批后在同一事务内 upsert
pub struct SummaryService {
    db: DatabaseConnection,
    id_generator: Arc<dyn IdGenerator>,
}

impl SummaryService {
    pub fn new(db: DatabaseConnection, id_generator: Arc<dyn IdGenerator>) -> Self {
        Self { db, id_generator }
    }

    /// 每个 (short_code, stat_date) 一行，按键排序以保证加锁顺序稳定
    pub fn convert(
        &self,
        operator: &str,
        deltas: &HashMap<AggregationKey, i64>,
    ) -> anyhow::Result<Vec<SummaryDelta>> {
        let mut keys: Vec<_> = deltas.iter().filter(|(_, n)| **n != 0).collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));

        keys.into_iter()
            .map(|(key, delta)| {
                Ok(SummaryDelta {
                    id: self.id_generator.next_id()?,
                    short_code: key.short_code.clone(),
                    stat_date: key.stat_date,
                    delta: *delta,
                    operator: operator.to_string(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl SummaryRecorder for SummaryService {
    async fn record_summary(
        &self,
        handler_key: &str,
        deltas: &HashMap<AggregationKey, i64>,
    ) -> anyhow::Result<()> {
        let rows = self.convert(handler_key, deltas)?;
        if rows.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;
        for chunk in rows.chunks(SUB_BATCH_SIZE) {
            // 出错时 txn 被 drop，整体回滚
            summary_writer::batch_upsert(&txn, chunk, now).await?;
        }
        txn.commit().await?;

        debug!(
            "[{}] Summary upserted: {} rows in {} statements",
            handler_key,
            rows.len(),
            rows.len().div_ceil(SUB_BATCH_SIZE)
        );
        Ok(())
    }
}
