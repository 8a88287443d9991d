//! 点击汇总表迁移
//!
//! click_stats_summary 按 (short_code, stat_date) 保存每日点击总数，
//! 由聚合消费者通过批量 upsert 累加。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClickStatsSummary::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClickStatsSummary::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ClickStatsSummary::ShortCode)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClickStatsSummary::StatDate).date().not_null())
                    .col(
                        ColumnDef::new(ClickStatsSummary::TotalClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ClickStatsSummary::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClickStatsSummary::CreatedBy)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ClickStatsSummary::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClickStatsSummary::UpdatedBy)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ClickStatsSummary::Description)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ClickStatsSummary::DeleteFlag)
                            .string_len(1)
                            .not_null()
                            .default("N"),
                    )
                    .col(
                        ColumnDef::new(ClickStatsSummary::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // upsert 依赖的唯一约束
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uk_short_code_date")
                    .table(ClickStatsSummary::Table)
                    .col(ClickStatsSummary::ShortCode)
                    .col(ClickStatsSummary::StatDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("uk_short_code_date")
                    .table(ClickStatsSummary::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ClickStatsSummary::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ClickStatsSummary {
    #[sea_orm(iden = "click_stats_summary")]
    Table,
    Id,
    ShortCode,
    StatDate,
    TotalClicks,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    Description,
    DeleteFlag,
    Version,
}
