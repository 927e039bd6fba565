//! Configuration schema types
//!
//! This module defines the structure of `tether.toml`.

use serde::Deserialize;
use std::collections::BTreeSet;
use toml::Spanned;

/// Main Tether configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TetherConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// `[[connection]]` declarations, with their byte spans in the source
    #[serde(default, rename = "connection")]
    pub connections: Vec<Spanned<toml::Table>>,

    /// `[[import]]` declarations
    #[serde(default, rename = "import")]
    pub imports: Vec<Spanned<ImportConfig>>,

    /// `[[param]]` declarations
    #[serde(default, rename = "param")]
    pub params: Vec<Spanned<ParamConfig>>,

    /// File the configuration was read from, and its text after substitution
    #[serde(skip)]
    pub source: Option<ConfigSource>,
}

impl TetherConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.logging.validate()?;

        for (i, table) in self.connections.iter().enumerate() {
            for key in [CONNECTION_TYPE_KEY, CONNECTION_NAME_KEY] {
                match table.get_ref().get(key) {
                    Some(toml::Value::String(s)) if !s.is_empty() => {}
                    _ => {
                        return Err(format!(
                            "connection #{} must have a non-empty string '{key}'",
                            i + 1
                        ))
                    }
                }
            }
        }

        let mut seen = BTreeSet::new();
        for param in &self.params {
            let param = param.get_ref();
            if param.name.is_empty() {
                return Err("param name cannot be empty".to_string());
            }
            if !seen.insert(param.name.as_str()) {
                return Err(format!("duplicate param '{}'", param.name));
            }
        }

        Ok(())
    }
}

/// Key holding the provider discriminator in a `[[connection]]` table
pub const CONNECTION_TYPE_KEY: &str = "type";
/// Key holding the connection name in a `[[connection]]` table
pub const CONNECTION_NAME_KEY: &str = "name";

/// Where a configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub filename: String,
    line_starts: Vec<usize>,
}

impl ConfigSource {
    pub fn new(filename: impl Into<String>, text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            filename: filename.into(),
            line_starts,
        }
    }

    /// 1-based line containing byte `offset`
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound on a single resolution, in seconds
    #[serde(default = "default_resolve_timeout_seconds")]
    pub resolve_timeout_seconds: u64,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        if self.resolve_timeout_seconds == 0 {
            return Err("application.resolve_timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            resolve_timeout_seconds: default_resolve_timeout_seconds(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

/// `[[import]]` declaration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportConfig {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default)]
    pub prefix: Option<String>,
}

/// `[[param]]` declaration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamConfig {
    pub name: String,

    /// Type expression, e.g. `list(connection.slack)`
    #[serde(rename = "type", default = "default_param_type")]
    pub type_expr: String,

    #[serde(default)]
    pub default: Option<toml::Value>,

    #[serde(default)]
    pub description: Option<String>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_resolve_timeout_seconds() -> u64 {
    30
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_param_type() -> String {
    "any".to_string()
}
