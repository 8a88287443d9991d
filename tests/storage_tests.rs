//! Storage tests
//!
//! 使用临时 SQLite 数据库验证汇总 upsert 与明细写入。

mod common;

use std::collections::HashMap;

use chrono::{NaiveDate, TimeZone, Utc};
use clickstats::analytics::{
    AggregationKey, ClickRecord, DeviceInfo, DeviceType, SummaryRecorder,
};
use clickstats::config::DatabaseConfig;
use clickstats::storage::{
    ClickRepository, DailyClicks, GroupBy, SUB_BATCH_SIZE, SummaryRepository, SummaryService,
    TimeRange, TimelinePoint, connect,
};
use common::{id_generator, temp_database};
use sea_orm::ConnectionTrait;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// =============================================================================
// 汇总写入
// =============================================================================

#[tokio::test]
async fn test_summary_insert_then_accumulate() {
    let (db, _dir) = temp_database().await;
    let service = SummaryService::new(db.clone(), id_generator());
    let repo = SummaryRepository::new(db);

    let key = AggregationKey::new("abc123", day(2024, 1, 1));
    let mut deltas = HashMap::new();
    deltas.insert(key.clone(), 5);
    service.record_summary("g_t", &deltas).await.unwrap();

    let row = repo.find("abc123", day(2024, 1, 1)).await.unwrap().unwrap();
    assert_eq!(row.total_clicks, 5);
    assert_eq!(row.delete_flag, "N");
    assert_eq!(row.created_by.as_deref(), Some("g_t"));
    let first_version = row.version;
    let first_id = row.id;

    deltas.insert(key, 3);
    service.record_summary("g_t2", &deltas).await.unwrap();

    let row = repo.find("abc123", day(2024, 1, 1)).await.unwrap().unwrap();
    assert_eq!(row.total_clicks, 8);
    assert_eq!(row.version, first_version + 1);
    // 主键与创建信息保持不变
    assert_eq!(row.id, first_id);
    assert_eq!(row.created_by.as_deref(), Some("g_t"));
    assert_eq!(row.updated_by.as_deref(), Some("g_t2"));
}

#[tokio::test]
async fn test_summary_rows_per_day() {
    let (db, _dir) = temp_database().await;
    let service = SummaryService::new(db.clone(), id_generator());
    let repo = SummaryRepository::new(db);

    let mut deltas = HashMap::new();
    deltas.insert(AggregationKey::new("abc123", day(2024, 1, 1)), 2);
    deltas.insert(AggregationKey::new("abc123", day(2024, 1, 2)), 4);
    deltas.insert(AggregationKey::new("zzz999", day(2024, 1, 1)), 1);
    service.record_summary("g_t", &deltas).await.unwrap();

    let totals = repo
        .daily_totals("abc123", day(2024, 1, 1), day(2024, 1, 31))
        .await
        .unwrap();
    assert_eq!(totals, vec![(day(2024, 1, 1), 2), (day(2024, 1, 2), 4)]);

    let other = repo.find("zzz999", day(2024, 1, 1)).await.unwrap().unwrap();
    assert_eq!(other.total_clicks, 1);
}

#[tokio::test]
async fn test_summary_more_rows_than_one_statement() {
    let (db, _dir) = temp_database().await;
    let service = SummaryService::new(db.clone(), id_generator());
    let repo = SummaryRepository::new(db);

    let count = SUB_BATCH_SIZE * 2 + 17;
    let deltas: HashMap<_, _> = (0..count)
        .map(|i| (AggregationKey::new(format!("code{:04}", i), day(2024, 3, 1)), 1))
        .collect();
    service.record_summary("g_t", &deltas).await.unwrap();

    for i in [0, SUB_BATCH_SIZE, count - 1] {
        let code = format!("code{:04}", i);
        let row = repo.find(&code, day(2024, 3, 1)).await.unwrap().unwrap();
        assert_eq!(row.total_clicks, 1, "row for {}", code);
    }
}

#[tokio::test]
async fn test_fresh_database_upserts_on_every_pooled_connection() {
    for round in 0..30 {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DatabaseConfig {
            database_url: format!("sqlite://{}?mode=rwc", dir.path().join("fresh.db").display()),
            ..Default::default()
        };
        let db = connect(&config).await.unwrap();
        let service = SummaryService::new(db.clone(), id_generator());

        let key = AggregationKey::new("abc123", day(2024, 1, 1));
        for _ in 0..5 {
            let deltas = HashMap::from([(key.clone(), 1)]);
            if let Err(e) = service.record_summary("g_t", &deltas).await {
                panic!("round {}: upsert failed on a fresh database: {:#}", round, e);
            }
        }

        let row = SummaryRepository::new(db)
            .find("abc123", day(2024, 1, 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.total_clicks, 5, "round {}", round);
    }
}

#[tokio::test]
async fn test_failing_later_chunk_rolls_back_earlier_chunks() {
    let (db, _dir) = temp_database().await;
    // 第二个分批中的某一行被拒绝
    db.execute_unprepared(
        "CREATE TRIGGER reject_code0150 BEFORE INSERT ON click_stats_summary \
         WHEN NEW.short_code = 'code0150' \
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
    )
    .await
    .unwrap();

    let service = SummaryService::new(db.clone(), id_generator());
    let deltas: HashMap<_, _> = (0..SUB_BATCH_SIZE * 2)
        .map(|i| (AggregationKey::new(format!("code{:04}", i), day(2024, 3, 1)), 1))
        .collect();

    assert!(service.record_summary("g_t", &deltas).await.is_err());

    let repo = SummaryRepository::new(db);
    for code in ["code0000", "code0099", "code0100", "code0199"] {
        assert!(
            repo.find(code, day(2024, 3, 1)).await.unwrap().is_none(),
            "{} should have been rolled back",
            code
        );
    }
}

#[tokio::test]
async fn test_summary_empty_deltas_is_noop() {
    let (db, _dir) = temp_database().await;
    let service = SummaryService::new(db.clone(), id_generator());

    service.record_summary("g_t", &HashMap::new()).await.unwrap();

    let repo = SummaryRepository::new(db);
    assert!(repo.find("abc123", day(2024, 1, 1)).await.unwrap().is_none());
}

// =============================================================================
// 明细写入
// =============================================================================

fn click_record(short_code: &str) -> ClickRecord {
    ClickRecord {
        short_code: short_code.to_string(),
        original_url: "https://example.com".to_string(),
        ip: "198.51.100.1".to_string(),
        user_agent: "curl/8.0".to_string(),
        referer: String::new(),
        country: "US".to_string(),
        region: String::new(),
        city: String::new(),
        device: DeviceInfo::unknown(),
        click_time: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        click_by: "anonymous".to_string(),
    }
}

#[tokio::test]
async fn test_click_insert_and_count() {
    let (db, _dir) = temp_database().await;
    let repo = ClickRepository::new(db, id_generator());

    let first = repo.insert(&click_record("abc123")).await.unwrap();
    let second = repo.insert(&click_record("abc123")).await.unwrap();
    repo.insert(&click_record("other")).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(repo.count_by_short_code("abc123").await.unwrap(), 2);
    assert_eq!(repo.count_by_short_code("other").await.unwrap(), 1);
    assert_eq!(repo.count_by_short_code("missing").await.unwrap(), 0);
}

// =============================================================================
// 报表查询
// =============================================================================

struct Click<'a> {
    code: &'a str,
    at: (i32, u32, u32, u32, u32),
    ip: &'a str,
    referer: &'a str,
    country: &'a str,
    device: (DeviceType, &'a str, &'a str),
}

async fn seed_clicks(repo: &ClickRepository, clicks: &[Click<'_>]) {
    for c in clicks {
        let (y, mo, d, h, mi) = c.at;
        let mut record = click_record(c.code);
        record.click_time = Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap();
        record.ip = c.ip.to_string();
        record.referer = c.referer.to_string();
        record.country = c.country.to_string();
        record.device = DeviceInfo {
            device_type: c.device.0,
            browser: c.device.1.to_string(),
            os: c.device.2.to_string(),
        };
        repo.insert(&record).await.unwrap();
    }
}

fn report_fixture() -> Vec<Click<'static>> {
    let desktop = (DeviceType::Desktop, "Chrome", "Windows");
    let phone = (DeviceType::Mobile, "Safari", "iOS");
    vec![
        Click { code: "abc123", at: (2024, 1, 1, 10, 5), ip: "10.0.0.1", referer: "https://a.example", country: "US", device: desktop },
        Click { code: "abc123", at: (2024, 1, 1, 11, 30), ip: "10.0.0.1", referer: "", country: "", device: phone },
        Click { code: "abc123", at: (2024, 1, 2, 9, 0), ip: "10.0.0.2", referer: "https://a.example", country: "US", device: phone },
        Click { code: "abc123", at: (2024, 2, 1, 8, 0), ip: "10.0.0.3", referer: "", country: "DE", device: desktop },
        Click { code: "other", at: (2024, 1, 1, 10, 0), ip: "10.0.0.9", referer: "", country: "FR", device: desktop },
    ]
}

fn january() -> TimeRange {
    TimeRange::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
    )
}

fn pairs(items: &[(&str, i64)]) -> Vec<(String, i64)> {
    items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[tokio::test]
async fn test_stats_summary_breakdowns() {
    let (db, _dir) = temp_database().await;
    let repo = ClickRepository::new(db, id_generator());
    seed_clicks(&repo, &report_fixture()).await;

    let report = repo.stats_summary("abc123", january()).await.unwrap();

    assert_eq!(report.total_clicks, 3);
    assert_eq!(
        report.daily,
        vec![
            DailyClicks { stat_date: "2024-01-02".to_string(), clicks: 1, unique_ips: 1 },
            DailyClicks { stat_date: "2024-01-01".to_string(), clicks: 2, unique_ips: 1 },
        ]
    );
    assert_eq!(report.referrers, pairs(&[("https://a.example", 2), ("direct", 1)]));
    assert_eq!(report.countries, pairs(&[("US", 2), ("unknown", 1)]));
    assert_eq!(report.devices, pairs(&[("mobile", 2), ("desktop", 1)]));
    assert_eq!(report.browsers, pairs(&[("Safari", 2), ("Chrome", 1)]));
    assert_eq!(report.systems, pairs(&[("iOS", 2), ("Windows", 1)]));
}

#[tokio::test]
async fn test_stats_summary_without_range_and_unknown_code() {
    let (db, _dir) = temp_database().await;
    let repo = ClickRepository::new(db, id_generator());
    seed_clicks(&repo, &report_fixture()).await;

    let all = repo.stats_summary("abc123", TimeRange::default()).await.unwrap();
    assert_eq!(all.total_clicks, 4);
    assert_eq!(all.countries, pairs(&[("US", 2), ("DE", 1), ("unknown", 1)]));

    let none = repo.stats_summary("missing", TimeRange::default()).await.unwrap();
    assert_eq!(none, Default::default());
}

#[tokio::test]
async fn test_click_timeline_granularity() {
    let (db, _dir) = temp_database().await;
    let repo = ClickRepository::new(db, id_generator());
    seed_clicks(&repo, &report_fixture()).await;

    let hourly = repo
        .click_timeline("abc123", january(), GroupBy::Hour)
        .await
        .unwrap();
    let periods: Vec<_> = hourly.iter().map(|p| p.period.as_str()).collect();
    assert_eq!(periods, ["2024-01-02 09:00", "2024-01-01 11:00", "2024-01-01 10:00"]);

    let monthly = repo
        .click_timeline("abc123", TimeRange::default(), GroupBy::Month)
        .await
        .unwrap();
    assert_eq!(
        monthly,
        vec![
            TimelinePoint { period: "2024-02".to_string(), clicks: 1, unique_visitors: 1 },
            TimelinePoint { period: "2024-01".to_string(), clicks: 3, unique_visitors: 2 },
        ]
    );
}
