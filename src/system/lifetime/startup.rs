//! 启动流程：校验配置 → 连接数据库 → 构建处理器与路由 → 连接 Kafka
//!
//! 任何一步失败都视为致命错误。

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;
use tracing::{debug, info};

use crate::analytics::tracker::{ProcessedEventTracker, build_tracker};
use crate::analytics::{AggregatingHandler, AggregatorOptions, DetailHandler, FlushSchedule};
use crate::config::{GroupConfig, HandlerKind, StaticConfig};
use crate::consumer::{
    ConsumerGroup, ConsumerManager, HandlerRouter, KafkaSession, MessageHandler, handler_key,
};
use crate::idgen::{IdGenerator, SnowflakeGenerator};
use crate::storage::{ClickRepository, SummaryService};

/// 处理器共享的依赖
#[derive(Clone)]
pub struct HandlerDeps {
    pub db: DatabaseConnection,
    pub id_generator: Arc<dyn IdGenerator>,
    pub tracker: Arc<dyn ProcessedEventTracker>,
}

pub struct StartupContext {
    pub db: DatabaseConnection,
    pub manager: ConsumerManager,
}

/// 按处理器类型创建 (group, topic) 对应的处理器
pub fn create_handler(
    group: &GroupConfig,
    topic: &str,
    deps: &HandlerDeps,
) -> Result<Arc<dyn MessageHandler>> {
    let key = handler_key(&group.group_id, topic);
    let handler: Arc<dyn MessageHandler> = match group.handler {
        HandlerKind::Summary => {
            let schedule = FlushSchedule::parse(&group.cron_spec)
                .with_context(|| format!("invalid cron_spec for group '{}'", group.group_id))?;
            let recorder = Arc::new(SummaryService::new(
                deps.db.clone(),
                deps.id_generator.clone(),
            ));
            Arc::new(AggregatingHandler::new(
                key,
                AggregatorOptions::new(group.batch_size, schedule),
                deps.tracker.clone(),
                recorder,
            ))
        }
        HandlerKind::Detail => {
            let recorder = Arc::new(ClickRepository::new(
                deps.db.clone(),
                deps.id_generator.clone(),
            ));
            Arc::new(DetailHandler::new(key, recorder))
        }
    };
    Ok(handler)
}

/// 为每个 (group, topic) 注册处理器
pub fn build_router(groups: &[GroupConfig], deps: &HandlerDeps) -> Result<HandlerRouter> {
    let mut router = HandlerRouter::new();
    for group in groups {
        for topic in &group.topics {
            let handler = create_handler(group, topic, deps)?;
            router.register(&group.group_id, topic, handler);
            debug!(
                group_id = %group.group_id,
                topic = %topic,
                kind = group.handler.as_ref(),
                "Handler registered"
            );
        }
    }
    Ok(router)
}

pub async fn prepare_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();

    crate::config::validate(config).context("Invalid configuration")?;

    let db = crate::storage::connect(&config.database)
        .await
        .context("Failed to initialize database")?;

    let id_generator: Arc<dyn IdGenerator> = Arc::new(
        SnowflakeGenerator::new(config.id_generator.node_id)
            .context("Failed to create id generator")?,
    );
    let tracker = build_tracker(&config.tracker).context("Failed to create event tracker")?;
    info!(
        "Idempotency tracker: {}",
        config.tracker.tracker_type.as_ref()
    );

    let deps = HandlerDeps {
        db: db.clone(),
        id_generator,
        tracker,
    };
    let router = Arc::new(build_router(&config.kafka.groups, &deps)?);

    let mut manager = ConsumerManager::new(router.clone());
    let backoff = Duration::from_millis(config.kafka.backoff_ms);
    for group in &config.kafka.groups {
        let session = KafkaSession::connect(&config.kafka, group)
            .await
            .with_context(|| format!("Failed to start consumer group '{}'", group.group_id))?;
        manager.add(ConsumerGroup::new(
            group.group_id.clone(),
            group.topics.clone(),
            backoff,
            Arc::new(session),
            router.clone(),
        ));
    }

    info!(
        "Startup completed in {:?}: {} consumer group(s), {} handler(s)",
        start_time.elapsed(),
        config.kafka.groups.len(),
        router.len()
    );

    Ok(StartupContext { db, manager })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::tracker::NoopTracker;
    use crate::config::KafkaConfig;

    #[tokio::test]
    async fn test_build_router_registers_every_topic() {
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("t.db").display());
        let db = crate::storage::connect_sqlite(&url).await.unwrap();
        let deps = HandlerDeps {
            db,
            id_generator: Arc::new(SnowflakeGenerator::new(1).unwrap()),
            tracker: Arc::new(NoopTracker),
        };

        let mut groups = KafkaConfig::default().groups;
        groups[1].topics.push("extra-topic".to_string());
        let router = build_router(&groups, &deps).unwrap();

        assert_eq!(router.len(), 3);
        assert!(router.get("stats-group-total", "short-link-click-events").is_some());
        assert!(router.get("stats-group-detail", "extra-topic").is_some());
        assert!(router.get("stats-group-total", "extra-topic").is_none());
    }
}
