//! 点击明细的报表查询
//!
//! 统计摘要（总数、每日、来源/国家/设备/浏览器/系统分布）与按时间粒度的趋势。

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Select, sea_query::Expr,
};

use super::ClickRepository;
use crate::errors::Result;
use migration::entities::click_event;

/// 趋势分组粒度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupBy {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

/// 按 click_time 过滤的闭区间，缺省一端表示不限
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct DailyClicks {
    /// `YYYY-MM-DD`
    pub stat_date: String,
    pub clicks: i64,
    pub unique_ips: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct TimelinePoint {
    pub period: String,
    pub clicks: i64,
    pub unique_visitors: i64,
}

#[derive(Debug, FromQueryResult)]
struct LabelCount {
    label: String,
    count: i64,
}

/// 单个短链接的统计摘要，各分布按点击数降序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickStatsReport {
    pub total_clicks: i64,
    /// 日期降序
    pub daily: Vec<DailyClicks>,
    pub referrers: Vec<(String, i64)>,
    pub countries: Vec<(String, i64)>,
    pub devices: Vec<(String, i64)>,
    pub browsers: Vec<(String, i64)>,
    pub systems: Vec<(String, i64)>,
}

/// click_time 的分组表达式
pub fn period_expr(backend: DbBackend, group_by: GroupBy) -> Expr {
    let (sqlite_fmt, mysql_fmt, pg_fmt) = match group_by {
        GroupBy::Hour => ("%Y-%m-%d %H:00", "%Y-%m-%d %H:00", "YYYY-MM-DD HH24:00"),
        GroupBy::Day => ("%Y-%m-%d", "%Y-%m-%d", "YYYY-MM-DD"),
        GroupBy::Week => ("%Y-W%W", "%Y-W%u", "IYYY-\"W\"IW"),
        GroupBy::Month => ("%Y-%m", "%Y-%m", "YYYY-MM"),
    };

    match backend {
        DbBackend::Sqlite => Expr::cust(format!("strftime('{}', click_time)", sqlite_fmt)),
        DbBackend::MySql => Expr::cust(format!("DATE_FORMAT(click_time, '{}')", mysql_fmt)),
        _ => Expr::cust(format!("TO_CHAR(click_time, '{}')", pg_fmt)),
    }
}

impl ClickRepository {
    fn scoped(&self, short_code: &str, range: TimeRange) -> Select<click_event::Entity> {
        let mut query = click_event::Entity::find()
            .filter(click_event::Column::ShortCode.eq(short_code))
            .filter(click_event::Column::DeleteFlag.eq("N"));
        if let Some(start) = range.start {
            query = query.filter(click_event::Column::ClickTime.gte(start));
        }
        if let Some(end) = range.end {
            query = query.filter(click_event::Column::ClickTime.lte(end));
        }
        query
    }

    /// 统计摘要
    pub async fn stats_summary(
        &self,
        short_code: &str,
        range: TimeRange,
    ) -> Result<ClickStatsReport> {
        let daily = self.daily_clicks(short_code, range).await?;
        let total_clicks = daily.iter().map(|d| d.clicks).sum();

        Ok(ClickStatsReport {
            total_clicks,
            daily,
            referrers: self.breakdown(short_code, range, "referer", "direct").await?,
            countries: self.breakdown(short_code, range, "country", "unknown").await?,
            devices: self.breakdown(short_code, range, "device_type", "other").await?,
            browsers: self.breakdown(short_code, range, "browser", "other").await?,
            systems: self.breakdown(short_code, range, "os", "other").await?,
        })
    }

    pub async fn daily_clicks(&self, short_code: &str, range: TimeRange) -> Result<Vec<DailyClicks>> {
        let day = period_expr(self.db.get_database_backend(), GroupBy::Day);
        let rows = self
            .scoped(short_code, range)
            .select_only()
            .column_as(day.clone(), "stat_date")
            .column_as(click_event::Column::Id.count(), "clicks")
            .column_as(Expr::cust("COUNT(DISTINCT ip)"), "unique_ips")
            .group_by(day)
            .order_by_desc(Expr::cust("stat_date"))
            .into_model::<DailyClicks>()
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    /// 按粒度统计点击数与独立访客，时间段降序
    pub async fn click_timeline(
        &self,
        short_code: &str,
        range: TimeRange,
        group_by: GroupBy,
    ) -> Result<Vec<TimelinePoint>> {
        let period = period_expr(self.db.get_database_backend(), group_by);
        let rows = self
            .scoped(short_code, range)
            .select_only()
            .column_as(period.clone(), "period")
            .column_as(click_event::Column::Id.count(), "clicks")
            .column_as(Expr::cust("COUNT(DISTINCT ip)"), "unique_visitors")
            .group_by(period)
            .order_by_desc(Expr::cust("period"))
            .into_model::<TimelinePoint>()
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    /// 单列分布，空值归入 `fallback`
    async fn breakdown(
        &self,
        short_code: &str,
        range: TimeRange,
        column: &str,
        fallback: &str,
    ) -> Result<Vec<(String, i64)>> {
        let label = Expr::cust(format!("COALESCE({}, '{}')", column, fallback));
        let rows = self
            .scoped(short_code, range)
            .select_only()
            .column_as(label.clone(), "label")
            .column_as(click_event::Column::Id.count(), "count")
            .group_by(label)
            .order_by_desc(Expr::cust("count"))
            .order_by_asc(Expr::cust("label"))
            .into_model::<LabelCount>()
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(|r| (r.label, r.count)).collect())
    }
}
