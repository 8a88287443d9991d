//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// clickstats - short-link click statistics consumer
#[derive(Parser, Debug)]
#[command(name = "clickstats")]
#[command(version)]
#[command(about = "Consumes short-link click events and maintains daily click statistics", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the consumer groups (default)
    Run,

    /// Print a sample configuration, or write it to a file
    GenerateConfig {
        /// Output file path
        output: Option<String>,
    },
}
