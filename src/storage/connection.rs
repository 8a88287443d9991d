use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use super::infer_backend_from_url;
use crate::config::DatabaseConfig;
use crate::errors::{Result, StatsError};
use migration::{Migrator, MigratorTrait};

/// 按 URL 类型建立连接并执行迁移
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    if config.database_url.is_empty() {
        return Err(StatsError::database_config("database_url is not set"));
    }

    let backend_name = infer_backend_from_url(&config.database_url)?;
    let db = if backend_name == "sqlite" {
        // 迁移已在建池前完成
        connect_sqlite(&config.database_url).await?
    } else {
        let db = connect_generic(config, &backend_name).await?;
        run_migrations(&db).await?;
        db
    };

    info!("{} storage initialized", backend_name.to_uppercase());
    Ok(db)
}

/// 连接 SQLite 数据库（带自动创建和性能优化）
///
/// 先在单独的连接上执行迁移再建立连接池：SQLite 连接会缓存 schema，
/// 迁移前打开的池连接看不到新建的唯一索引，upsert 的 ON CONFLICT 会失败。
pub async fn connect_sqlite(database_url: &str) -> Result<DatabaseConnection> {
    use sea_orm::SqlxSqliteConnector;
    use sea_orm::sqlx::sqlite::SqlitePoolOptions;

    let opt = sqlite_options(database_url)?;

    let migrator_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opt.clone())
        .await
        .map_err(|e| {
            StatsError::database_connection(format!("cannot connect to SQLite: {}", e))
        })?;
    let migrator_db = SqlxSqliteConnector::from_sqlx_sqlite_pool(migrator_pool.clone());
    let migrated = run_migrations(&migrator_db).await;
    migrator_pool.close().await;
    migrated?;

    let pool = SqlitePoolOptions::new().connect_with(opt).await.map_err(|e| {
        StatsError::database_connection(format!("cannot connect to SQLite: {}", e))
    })?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

fn sqlite_options(database_url: &str) -> Result<sea_orm::sqlx::sqlite::SqliteConnectOptions> {
    use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
    use std::str::FromStr;

    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite://{}", database_url)
    };

    Ok(SqliteConnectOptions::from_str(&url)
        .map_err(|e| StatsError::database_config(format!("invalid SQLite URL: {}", e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5)))
}

/// 连接通用数据库（MySQL/PostgreSQL）
pub async fn connect_generic(
    config: &DatabaseConfig,
    backend_name: &str,
) -> Result<DatabaseConnection> {
    let pool_size = config.pool_size;
    let timeout = Duration::from_secs(config.timeout);

    let mut opt = ConnectOptions::new(config.database_url.clone());
    opt.max_connections(pool_size)
        .min_connections(pool_size.min(5))
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);

    Database::connect(opt).await.map_err(|e| {
        StatsError::database_connection(format!(
            "cannot connect to {} database: {}",
            backend_name.to_uppercase(),
            e
        ))
    })
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .map_err(|e| StatsError::database_operation(format!("migration failed: {}", e)))?;

    info!("Database migrations completed");
    Ok(())
}
