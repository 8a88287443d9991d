pub mod aggregator;
pub mod detail;
pub mod device;
pub mod message;
pub mod schedule;
pub mod sink;
pub mod tracker;

pub use aggregator::{AggregatingHandler, AggregatorOptions};
pub use detail::DetailHandler;
pub use device::{DeviceInfo, DeviceType};
pub use message::{ClickEventMessage, EventEnvelope};
pub use schedule::FlushSchedule;
pub use sink::{ClickRecorder, SummaryRecorder};
pub use tracker::ProcessedEventTracker;

use chrono::{DateTime, NaiveDate, Utc};

/// short_code 列宽
pub const SHORT_CODE_MAX_LEN: usize = 20;

/// 聚合键：(短链接代码, 自然日)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregationKey {
    pub short_code: String,
    pub stat_date: NaiveDate,
}

impl AggregationKey {
    pub fn new(short_code: impl Into<String>, stat_date: NaiveDate) -> Self {
        Self {
            short_code: short_code.into(),
            stat_date,
        }
    }

    /// 日期取点击时间自身时区下的日期
    pub fn from_click(message: &ClickEventMessage) -> Self {
        Self::new(message.short_code.clone(), message.click_date())
    }
}

/// 待写入明细表的一条点击
#[derive(Debug, Clone)]
pub struct ClickRecord {
    pub short_code: String,
    pub original_url: String,
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub device: DeviceInfo,
    pub click_time: DateTime<Utc>,
    pub click_by: String,
}
