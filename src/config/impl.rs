use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;
use crate::errors::Result;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
        .load_full()
}

/// Initialize the global configuration from `path` plus `CS__*` overrides.
///
/// The first successful call wins; later calls return the stored instance.
pub fn init_config(path: &str) -> Result<Arc<StaticConfig>> {
    if let Some(existing) = CONFIG.get() {
        return Ok(existing.load_full());
    }
    let loaded = StaticConfig::load(path)?;
    Ok(CONFIG
        .get_or_init(|| ArcSwap::from_pointee(loaded))
        .load_full())
}
