//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{ConfigSource, TetherConfig};
use crate::domain::errors::TetherError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into TetherConfig
/// 4. Applies environment variable overrides (TETHER_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use tether::config::loader::load_config;
///
/// let config = load_config("tether.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TetherConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TetherError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        TetherError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    // spans refer to the substituted text
    let contents = substitute_env_vars(&contents)?;
    let mut config = parse_toml(&contents)?;
    config.source = Some(ConfigSource::new(path.display().to_string(), &contents));

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        TetherError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    tracing::debug!(
        path = %path.display(),
        connections = config.connections.len(),
        params = config.params.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Parses configuration text after `${VAR}` substitution
///
/// Overrides and validation are left to the caller.
///
/// # Errors
///
/// Returns an error for missing variables or invalid TOML.
pub fn parse_config(contents: &str) -> Result<TetherConfig> {
    parse_toml(&substitute_env_vars(contents)?)
}

fn parse_toml(contents: &str) -> Result<TetherConfig> {
    toml::from_str(contents)
        .map_err(|e| TetherError::Configuration(format!("Failed to parse TOML: {}", e)))
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| TetherError::Internal(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                if !missing_vars.iter().any(|v| v == var_name) {
                    missing_vars.push(var_name.to_string());
                }
                String::new()
            })
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(TetherError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using TETHER_* prefix
///
/// Environment variables follow the pattern: TETHER_<SECTION>_<KEY>
/// For example: TETHER_APPLICATION_LOG_LEVEL, TETHER_LOGGING_LOCAL_PATH
fn apply_env_overrides(config: &mut TetherConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("TETHER_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("TETHER_APPLICATION_RESOLVE_TIMEOUT_SECONDS") {
        config.application.resolve_timeout_seconds = val.parse().map_err(|_| {
            TetherError::Configuration(format!(
                "TETHER_APPLICATION_RESOLVE_TIMEOUT_SECONDS must be a whole number, got '{val}'"
            ))
        })?;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("TETHER_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("TETHER_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
