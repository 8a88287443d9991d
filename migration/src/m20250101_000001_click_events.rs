//! 点击事件明细表迁移
//!
//! 创建 click_events 表，每条点击事件一行，供明细分析查询使用。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClickEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClickEvents::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ClickEvents::ShortCode)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClickEvents::OriginalUrl)
                            .string_len(2048)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClickEvents::Ip).string_len(45).not_null())
                    .col(ColumnDef::new(ClickEvents::UserAgent).text().null())
                    .col(ColumnDef::new(ClickEvents::Referer).string_len(512).null())
                    .col(ColumnDef::new(ClickEvents::Country).string_len(2).null())
                    .col(ColumnDef::new(ClickEvents::Region).string_len(100).null())
                    .col(ColumnDef::new(ClickEvents::City).string_len(100).null())
                    .col(ColumnDef::new(ClickEvents::DeviceType).string_len(16).null())
                    .col(ColumnDef::new(ClickEvents::Browser).string_len(100).null())
                    .col(ColumnDef::new(ClickEvents::Os).string_len(100).null())
                    .col(
                        ColumnDef::new(ClickEvents::ClickTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClickEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClickEvents::CreatedBy).string_len(100).null())
                    .col(
                        ColumnDef::new(ClickEvents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(ClickEvents::UpdatedBy).string_len(100).null())
                    .col(
                        ColumnDef::new(ClickEvents::Description)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ClickEvents::DeleteFlag)
                            .string_len(1)
                            .not_null()
                            .default("N"),
                    )
                    .col(
                        ColumnDef::new(ClickEvents::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // 单链接时间序列查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_click_events_code_time")
                    .table(ClickEvents::Table)
                    .col(ClickEvents::ShortCode)
                    .col(ClickEvents::ClickTime)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_click_events_code_time")
                    .table(ClickEvents::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ClickEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ClickEvents {
    #[sea_orm(iden = "click_events")]
    Table,
    Id,
    ShortCode,
    OriginalUrl,
    Ip,
    UserAgent,
    Referer,
    Country,
    Region,
    City,
    DeviceType,
    Browser,
    Os,
    ClickTime,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    Description,
    DeleteFlag,
    Version,
}
