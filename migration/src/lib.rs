pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20250101_000001_click_events;
mod m20250101_000002_click_stats_summary;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_click_events::Migration),
            Box::new(m20250101_000002_click_stats_summary::Migration),
        ]
    }
}
