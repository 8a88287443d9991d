use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};

use crate::analytics::{ClickRecord, ClickRecorder};
use crate::errors::Result;
use crate::idgen::IdGenerator;
use migration::entities::click_event;

/// 点击明细表读写
#[derive(Clone)]
pub struct ClickRepository {
    pub(super) db: DatabaseConnection,
    id_generator: Arc<dyn IdGenerator>,
}

impl ClickRepository {
    pub fn new(db: DatabaseConnection, id_generator: Arc<dyn IdGenerator>) -> Self {
        Self { db, id_generator }
    }

    /// 写入一条明细，返回生成的 ID
    pub async fn insert(&self, record: &ClickRecord) -> Result<i64> {
        let id = self.id_generator.next_id()?;
        let now = Utc::now();
        let model = click_event::ActiveModel {
            id: Set(id),
            short_code: Set(record.short_code.clone()),
            original_url: Set(record.original_url.clone()),
            ip: Set(record.ip.clone()),
            user_agent: Set(non_empty(&record.user_agent)),
            referer: Set(non_empty(&record.referer)),
            country: Set(non_empty(&record.country)),
            region: Set(non_empty(&record.region)),
            city: Set(non_empty(&record.city)),
            device_type: Set(Some(record.device.device_type.as_ref().to_string())),
            browser: Set(Some(record.device.browser.clone())),
            os: Set(Some(record.device.os.clone())),
            click_time: Set(record.click_time),
            created_at: Set(now),
            created_by: Set(non_empty(&record.click_by)),
            updated_at: Set(Some(now)),
            updated_by: Set(non_empty(&record.click_by)),
            description: Set(None),
            delete_flag: Set("N".to_string()),
            version: Set(0),
        };

        click_event::Entity::insert(model).exec(&self.db).await?;
        Ok(id)
    }

    pub async fn count_by_short_code(&self, short_code: &str) -> Result<u64> {
        let count = click_event::Entity::find()
            .filter(click_event::Column::ShortCode.eq(short_code))
            .filter(click_event::Column::DeleteFlag.eq("N"))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[async_trait]
impl ClickRecorder for ClickRepository {
    async fn record_click(&self, record: &ClickRecord) -> anyhow::Result<()> {
        self.insert(record).await?;
        Ok(())
    }
}
