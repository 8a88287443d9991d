use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use crate::errors::Result;
use migration::entities::click_stats_summary;

/// 每日汇总读取（报表查询）
#[derive(Clone)]
pub struct SummaryRepository {
    db: DatabaseConnection,
}

impl SummaryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find(
        &self,
        short_code: &str,
        stat_date: NaiveDate,
    ) -> Result<Option<click_stats_summary::Model>> {
        let row = click_stats_summary::Entity::find()
            .filter(click_stats_summary::Column::ShortCode.eq(short_code))
            .filter(click_stats_summary::Column::StatDate.eq(stat_date))
            .filter(click_stats_summary::Column::DeleteFlag.eq("N"))
            .one(&self.db)
            .await?;
        Ok(row)
    }

    /// [from, to] 区间内每日点击数，按日期升序
    pub async fn daily_totals(
        &self,
        short_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, i64)>> {
        let rows = click_stats_summary::Entity::find()
            .filter(click_stats_summary::Column::ShortCode.eq(short_code))
            .filter(click_stats_summary::Column::StatDate.between(from, to))
            .filter(click_stats_summary::Column::DeleteFlag.eq("N"))
            .order_by_asc(click_stats_summary::Column::StatDate)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.stat_date, r.total_clicks))
            .collect())
    }
}
