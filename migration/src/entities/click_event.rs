//! 点击事件明细实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "click_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub ip: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    /// ISO 3166-1 alpha-2
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    /// desktop / mobile / tablet / bot / other
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub click_time: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub created_by: Option<String>,
    pub updated_at: Option<DateTimeUtc>,
    pub updated_by: Option<String>,
    pub description: Option<String>,
    pub delete_flag: String,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
