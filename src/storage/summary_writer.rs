//! 每日汇总 upsert
//!
//! 单条多行 INSERT，以 (short_code, stat_date) 为冲突键：
//! 新键插入，已有键累加 total_clicks 并递增 version。

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveValue::Set,
    ConnectionTrait, DatabaseBackend, EntityTrait, ExprTrait,
    sea_query::{Expr, OnConflict},
};

use migration::entities::click_stats_summary;

/// 一行待写入的汇总增量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDelta {
    /// 仅在插入新行时使用
    pub id: i64,
    pub short_code: String,
    pub stat_date: NaiveDate,
    pub delta: i64,
    /// 审计字段 created_by / updated_by
    pub operator: String,
}

/// 在调用方提供的连接或事务上执行批量 upsert
pub async fn batch_upsert<C: ConnectionTrait>(
    db: &C,
    rows: &[SummaryDelta],
    now: DateTime<Utc>,
) -> Result<(), sea_orm::DbErr> {
    if rows.is_empty() {
        return Ok(());
    }

    let models: Vec<click_stats_summary::ActiveModel> = rows
        .iter()
        .map(|row| click_stats_summary::ActiveModel {
            id: Set(row.id),
            short_code: Set(row.short_code.clone()),
            stat_date: Set(row.stat_date),
            total_clicks: Set(row.delta),
            created_at: Set(now),
            created_by: Set(Some(row.operator.clone())),
            updated_at: Set(now),
            updated_by: Set(Some(row.operator.clone())),
            description: Set(None),
            delete_flag: Set("N".to_string()),
            version: Set(0),
        })
        .collect();

    click_stats_summary::Entity::insert_many(models)
        .on_conflict(on_conflict(db.get_database_backend()))
        .exec(db)
        .await?;

    Ok(())
}

/// MySQL 使用 VALUES(column)，SQLite/PostgreSQL 使用 excluded.column
fn on_conflict(backend: DatabaseBackend) -> OnConflict {
    use click_stats_summary::Column;

    let incoming = |column: &str| match backend {
        DatabaseBackend::MySql => Expr::cust(format!("VALUES({})", column)),
        _ => Expr::cust(format!("excluded.{}", column)),
    };

    OnConflict::columns([Column::ShortCode, Column::StatDate])
        .value(
            Column::TotalClicks,
            Expr::col(Column::TotalClicks).add(incoming("total_clicks")),
        )
        .value(Column::Version, Expr::col(Column::Version).add(1))
        .value(Column::UpdatedAt, incoming("updated_at"))
        .value(Column::UpdatedBy, incoming("updated_by"))
        .to_owned()
}
