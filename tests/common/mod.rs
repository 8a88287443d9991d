//! 集成测试共用工具

#![allow(dead_code)]

use std::sync::Arc;

use clickstats::idgen::{IdGenerator, SnowflakeGenerator};
use clickstats::storage::connect_sqlite;
use sea_orm::DatabaseConnection;
use tempfile::TempDir;

/// 创建已迁移的临时 SQLite 数据库（connect_sqlite 内部执行迁移）
pub async fn temp_database() -> (DatabaseConnection, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let db = connect_sqlite(&db_url)
        .await
        .expect("Failed to connect sqlite");

    (db, temp_dir)
}

pub fn id_generator() -> Arc<dyn IdGenerator> {
    Arc::new(SnowflakeGenerator::new(7).expect("valid node id"))
}

/// 构造一条点击事件 JSON
pub fn click_payload(event_id: &str, short_code: &str, click_time: &str) -> Vec<u8> {
    serde_json::json!({
        "event_id": event_id,
        "event_type": "short_link_click",
        "timestamp": click_time,
        "source": "shortener-service",
        "short_code": short_code,
        "original_url": "https://example.com/landing",
        "ip": "203.0.113.7",
        "user_agent": "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        "referer": "https://news.example.org/",
        "click_time": click_time,
        "click_by": "anonymous",
        "country": "CN",
        "region": "Zhejiang",
        "city": "Hangzhou"
    })
    .to_string()
    .into_bytes()
}
