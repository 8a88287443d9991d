//! clickstats - click statistics service for the short-link platform
//!
//! Consumes click events from Kafka and keeps two views of them:
//! per-day counters per short code, and one detail row per click.
//!
//! # Architecture
//! - `consumer`: consumer-group supervision, routing and the Kafka session
//! - `analytics`: event decoding, aggregation and per-click handlers
//! - `storage`: database connection and repositories
//! - `config`: configuration loading and validation
//! - `system`: logging and application lifecycle

pub mod analytics;
pub mod cli;
pub mod config;
pub mod consumer;
pub mod errors;
pub mod idgen;
pub mod storage;
pub mod system;
