pub mod click_event;
pub mod click_stats_summary;

pub use click_event::Entity as ClickEventEntity;
pub use click_stats_summary::Entity as ClickStatsSummaryEntity;
