//! 启动配置校验
//!
//! 任一规则不满足即视为致命错误。

use std::collections::HashSet;

use super::StaticConfig;
use crate::analytics::schedule::FlushSchedule;
use crate::errors::{Result, StatsError};
use crate::idgen::MAX_NODE_ID;

/// 校验完整配置
pub fn validate(config: &StaticConfig) -> Result<()> {
    let kafka = &config.kafka;

    if kafka.brokers.iter().all(|b| b.trim().is_empty()) {
        return Err(StatsError::validation("kafka.brokers must not be empty"));
    }
    validate_version(&kafka.version)?;

    let mut seen = HashSet::new();
    for group in &kafka.groups {
        if group.group_id.trim().is_empty() {
            return Err(StatsError::validation("group_id must not be empty"));
        }
        if !seen.insert(group.group_id.as_str()) {
            return Err(StatsError::validation(format!(
                "duplicate group_id '{}'",
                group.group_id
            )));
        }
        if group.topics.iter().all(|t| t.trim().is_empty()) {
            return Err(StatsError::validation(format!(
                "group '{}' has no topics",
                group.group_id
            )));
        }
        if group.batch_size == 0 {
            return Err(StatsError::validation(format!(
                "group '{}': batch_size must be positive",
                group.group_id
            )));
        }
        if group.session_timeout_ms < 3 {
            return Err(StatsError::validation(format!(
                "group '{}': session_timeout_ms too small",
                group.group_id
            )));
        }
        FlushSchedule::parse(&group.cron_spec).map_err(|e| {
            StatsError::validation(format!("group '{}': {}", group.group_id, e))
        })?;
    }

    if config.id_generator.node_id > MAX_NODE_ID {
        return Err(StatsError::validation(format!(
            "id_generator.node_id must be <= {}",
            MAX_NODE_ID
        )));
    }

    Ok(())
}

/// broker 版本号：两到四段数字，如 "2.8.0"
pub fn validate_version(version: &str) -> Result<()> {
    let parts: Vec<&str> = version.trim().split('.').collect();
    let well_formed = (2..=4).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if well_formed {
        Ok(())
    } else {
        Err(StatsError::validation(format!(
            "invalid kafka version '{}'",
            version
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GroupConfig, HandlerKind};

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&StaticConfig::default()).is_ok());
    }

    #[test]
    fn test_version_strings() {
        assert!(validate_version("2.8.0").is_ok());
        assert!(validate_version("0.10.2.1").is_ok());
        assert!(validate_version("3").is_err());
        assert!(validate_version("v2.8").is_err());
        assert!(validate_version("2..0").is_err());
    }

    #[test]
    fn test_rejects_empty_brokers() {
        let mut config = StaticConfig::default();
        config.kafka.brokers.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let mut config = StaticConfig::default();
        config.kafka.groups[0].batch_size = 0;
        let err = validate(&config).unwrap_err();
        assert_eq!(err.code(), "E009");
    }

    #[test]
    fn test_rejects_bad_cron_spec() {
        let mut config = StaticConfig::default();
        config.kafka.groups[0].cron_spec = "every ten seconds".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_duplicate_group_and_empty_topics() {
        let mut config = StaticConfig::default();
        let mut dup = GroupConfig::new(HandlerKind::Detail);
        dup.group_id = "stats-group-total".to_string();
        config.kafka.groups.push(dup);
        assert!(validate(&config).is_err());

        let mut config = StaticConfig::default();
        config.kafka.groups[1].topics.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_large_node_id() {
        let mut config = StaticConfig::default();
        config.id_generator.node_id = 2048;
        assert!(validate(&config).is_err());
    }
}
