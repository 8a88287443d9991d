//! 点击事件消息格式
//!
//! JSON 字段为 snake_case，同时接受 camelCase 别名。

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 零值时间 0001-01-01T00:00:00Z 的 Unix 秒
const ZERO_TIME_UNIX_SECS: i64 = -62_135_596_800;

/// 所有事件共享的信封
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(alias = "eventId")]
    pub event_id: String,
    #[serde(default, alias = "eventType")]
    pub event_type: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub source: String,
}

impl EventEnvelope {
    /// 仅解析信封；event_id 为空视为格式错误
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: EventEnvelope = serde_json::from_slice(payload)?;
        if envelope.event_id.trim().is_empty() {
            return Err(serde::de::Error::custom("event_id is empty"));
        }
        Ok(envelope)
    }
}

/// 点击事件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClickEventMessage {
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    #[serde(alias = "shortCode")]
    pub short_code: String,
    #[serde(default, alias = "originalUrl")]
    pub original_url: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default, alias = "userAgent")]
    pub user_agent: String,
    #[serde(default)]
    pub referer: String,
    #[serde(default, alias = "clickTime")]
    pub click_time: Option<DateTime<FixedOffset>>,
    #[serde(default, alias = "clickBy")]
    pub click_by: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub city: String,
}

impl ClickEventMessage {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let message: ClickEventMessage = serde_json::from_slice(payload)?;
        if message.short_code.is_empty() {
            return Err(serde::de::Error::custom("short_code is empty"));
        }
        Ok(message)
    }

    /// 点击时间缺失或为零值时补为当前时间
    pub fn default_click_time(&mut self, now: DateTime<Utc>) {
        let absent = match self.click_time {
            None => true,
            Some(t) => t.timestamp() <= ZERO_TIME_UNIX_SECS,
        };
        if absent {
            self.click_time = Some(now.fixed_offset());
        }
    }

    pub fn click_date(&self) -> NaiveDate {
        self.click_time
            .map(|t| t.date_naive())
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn click_time_utc(&self) -> DateTime<Utc> {
        self.click_time
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"{
        "event_id": "e-1",
        "event_type": "click",
        "timestamp": "2024-01-01T10:00:00Z",
        "source": "redirect-service",
        "short_code": "abc123",
        "original_url": "https://example.com",
        "ip": "10.0.0.1",
        "user_agent": "Mozilla/5.0",
        "click_time": "2024-01-01T23:30:00+08:00",
        "click_by": "alice"
    }"#;

    #[test]
    fn test_parse_full_message() {
        let msg = ClickEventMessage::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(msg.envelope.event_id, "e-1");
        assert_eq!(msg.envelope.source, "redirect-service");
        assert_eq!(msg.short_code, "abc123");
        assert_eq!(msg.click_by, "alice");
        assert!(msg.referer.is_empty());
        // 按事件自身时区取日期
        assert_eq!(msg.click_date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_envelope_accepts_camel_case() {
        let env = EventEnvelope::parse(br#"{"eventId":"x","eventType":"click"}"#).unwrap();
        assert_eq!(env.event_id, "x");
        assert_eq!(env.event_type, "click");
    }

    #[test]
    fn test_envelope_rejects_garbage_and_missing_id() {
        assert!(EventEnvelope::parse(b"not json").is_err());
        assert!(EventEnvelope::parse(br#"{"event_type":"click"}"#).is_err());
        assert!(EventEnvelope::parse(br#"{"event_id":"  "}"#).is_err());
    }

    #[test]
    fn test_zero_click_time_is_defaulted() {
        let mut msg = ClickEventMessage::parse(
            br#"{"event_id":"e","short_code":"c","click_time":"0001-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        msg.default_click_time(now);
        assert_eq!(msg.click_time_utc(), now);
        assert_eq!(msg.click_date(), NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
    }

    #[test]
    fn test_missing_click_time_is_defaulted() {
        let mut msg = ClickEventMessage::parse(br#"{"event_id":"e","short_code":"c"}"#).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        msg.default_click_time(now);
        assert_eq!(msg.click_time_utc(), now);
    }

    #[test]
    fn test_present_click_time_is_kept() {
        let mut msg = ClickEventMessage::parse(SAMPLE.as_bytes()).unwrap();
        msg.default_click_time(Utc::now());
        assert_eq!(
            msg.click_time_utc(),
            Utc.with_ymd_and_hms(2024, 1, 1, 15, 30, 0).unwrap()
        );
    }
}
