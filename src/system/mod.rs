//! System-level modules
//!
//! - Logging initialization
//! - Lifecycle management (startup, shutdown)

pub mod lifetime;
pub mod logging;
