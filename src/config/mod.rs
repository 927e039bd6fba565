//! Configuration management for Tether.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Tether uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `TETHER_<SECTION>_<KEY>` overrides
//! - Default values for optional settings
//! - Source positions for declarations, so diagnostics can point at a line
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tether::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tether.toml")?;
//! println!("Log level: {}", config.application.log_level);
//! println!("Declared connections: {}", config.connections.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and resolution timeout
//! - [`LoggingConfig`] - Local file logging
//! - `[[connection]]` - One table per declared connection; `type` and `name`
//!   select the provider and name, every other key is a provider attribute
//! - [`ImportConfig`] - Connections imported from elsewhere
//! - [`ParamConfig`] - Typed parameters whose defaults may reference connections
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//! resolve_timeout_seconds = 30
//!
//! [[connection]]
//! type = "slack"
//! name = "team"
//! token = "${TEAM_SLACK_TOKEN}"
//!
//! [[connection]]
//! type = "aws"
//! name = "prod"
//! profile = "prod"
//!
//! [[param]]
//! name = "notify"
//! type = "list(connection.slack)"
//! default = [{ resource_type = "connection", type = "slack", name = "slack.team" }]
//! ```
//!
//! A connection with no attributes, or a provider with no declaration at
//! all, resolves its credentials from the environment at run time.

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, ConfigSource, ImportConfig, LoggingConfig, ParamConfig, TetherConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
