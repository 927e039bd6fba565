//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Tether using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Tether - typed connection runtime
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(version, about, long_about = None)]
#[command(author = "Tether Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "tether.toml", env = "TETHER_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "TETHER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration file and report diagnostics
    ValidateConfig(commands::validate::ValidateArgs),

    /// List registered connection types
    Providers(commands::providers::ProvidersArgs),

    /// Resolve a connection and print its value as JSON
    Resolve(commands::resolve::ResolveArgs),
}
