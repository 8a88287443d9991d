//! SeaORM storage
//!
//! Connection handling plus the two write paths (daily summary upsert and raw
//! click rows) and their read-side queries. SQLite, MySQL/MariaDB and
//! PostgreSQL are supported.

mod click_repository;
mod click_stats;
mod connection;
mod summary_repository;
mod summary_service;
pub mod summary_writer;

pub use click_repository::ClickRepository;
pub use click_stats::{ClickStatsReport, DailyClicks, GroupBy, TimeRange, TimelinePoint, period_expr};
pub use connection::{connect, connect_generic, connect_sqlite, run_migrations};
pub use summary_repository::SummaryRepository;
pub use summary_service::{SUB_BATCH_SIZE, SummaryService};
pub use summary_writer::SummaryDelta;

use crate::errors::{Result, StatsError};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(StatsError::database_config(format!(
            "cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend() {
        assert_eq!(
            infer_backend_from_url("sqlite://stats.db?mode=rwc").unwrap(),
            "sqlite"
        );
        assert_eq!(infer_backend_from_url("stats.db").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("mysql://root@localhost/stats").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("mariadb://root@localhost/stats").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/stats").unwrap(),
            "postgres"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }
}
