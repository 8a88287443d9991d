//! 定时 flush 的调度表达式
//!
//! 支持：
//! - `@every 10s`、`@every 500ms`、`@every 1m30s`
//! - `@hourly`、`@daily` 等描述符
//! - 5 段（分起始）或 6/7 段（秒起始）cron 表达式

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::errors::{Result, StatsError};

#[derive(Debug, Clone)]
pub enum FlushSchedule {
    Every(Duration),
    Cron(Box<cron::Schedule>),
}

impl FlushSchedule {
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(StatsError::config("empty flush schedule"));
        }

        if let Some(rest) = spec.strip_prefix("@every") {
            let interval = parse_duration(rest.trim())?;
            if interval.is_zero() {
                return Err(StatsError::config(format!(
                    "flush interval must be positive: '{}'",
                    spec
                )));
            }
            return Ok(Self::Every(interval));
        }

        let expr = if !spec.starts_with('@') && spec.split_whitespace().count() == 5 {
            format!("0 {}", spec)
        } else {
            spec.to_string()
        };
        let schedule = cron::Schedule::from_str(&expr).map_err(|e| {
            StatsError::config(format!("invalid cron expression '{}': {}", spec, e))
        })?;
        Ok(Self::Cron(Box::new(schedule)))
    }

    /// 距离下一次触发的等待时间；没有后续触发点时返回 None
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            Self::Every(interval) => Some(*interval),
            Self::Cron(schedule) => {
                let next = schedule.after(&now).next()?;
                Some((next - now).to_std().unwrap_or(Duration::ZERO))
            }
        }
    }
}

/// 解析 `1h30m`、`10s`、`250ms` 形式的时长
fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || StatsError::config(format!("invalid duration '{}'", input));
    if input.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
        if digits == 0 {
            return Err(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            _ => return Err(invalid()),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| StatsError::config(format!("duration '{}' is too large", input)))?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}
