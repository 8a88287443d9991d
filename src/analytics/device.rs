//! User-Agent 启发式解析：设备类型、浏览器、操作系统

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use woothee::parser::Parser;

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Bot,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub browser: String,
    pub os: String,
}

impl DeviceInfo {
    pub fn unknown() -> Self {
        Self {
            device_type: DeviceType::Other,
            browser: "unknown".to_string(),
            os: "unknown".to_string(),
        }
    }
}

/// 解析 User-Agent；空串返回 other/unknown/unknown
pub fn detect(user_agent: &str) -> DeviceInfo {
    if user_agent.is_empty() {
        return DeviceInfo::unknown();
    }

    let parser = Parser::new();
    let result = parser.parse(user_agent).unwrap_or_default();

    DeviceInfo {
        device_type: device_type(&result.category, user_agent),
        browser: normalize_browser(&result.name),
        os: normalize_os(&result.os),
    }
}

fn device_type(category: &str, user_agent: &str) -> DeviceType {
    let ua = user_agent.to_lowercase();

    if category == "crawler" || ["bot", "crawler", "spider"].iter().any(|k| ua.contains(k)) {
        return DeviceType::Bot;
    }

    if ua.contains("tablet") || ua.contains("ipad") {
        return DeviceType::Tablet;
    }
    if category == "smartphone"
        || category == "mobilephone"
        || ["mobile", "android", "iphone"].iter().any(|k| ua.contains(k))
    {
        return DeviceType::Mobile;
    }
    if category == "pc" || ["windows", "macintosh", "linux"].iter().any(|k| ua.contains(k)) {
        return DeviceType::Desktop;
    }
    DeviceType::Other
}

fn normalize_browser(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower == "unknown" || lower.is_empty() {
        return "unknown".to_string();
    }
    if lower.contains("edge") {
        "Edge".to_string()
    } else if lower.contains("opera") {
        "Opera".to_string()
    } else if lower.contains("chrome") {
        "Chrome".to_string()
    } else if lower.contains("firefox") {
        "Firefox".to_string()
    } else if lower.contains("safari") {
        "Safari".to_string()
    } else {
        truncate(&lower, MAX_NAME_LEN)
    }
}

fn normalize_os(os: &str) -> String {
    let lower = os.to_lowercase();
    if lower == "unknown" || lower.is_empty() {
        return "unknown".to_string();
    }
    if lower.contains("windows") {
        "Windows".to_string()
    } else if lower.contains("android") {
        "Android".to_string()
    } else if lower.contains("ios") || lower.contains("iphone") || lower.contains("ipad") {
        "iOS".to_string()
    } else if lower.contains("mac") {
        "macOS".to_string()
    } else if lower.contains("linux") {
        "Linux".to_string()
    } else {
        truncate(&lower, MAX_NAME_LEN)
    }
}

/// 按字符截断
pub fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
