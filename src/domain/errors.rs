//! Domain error types
//!
//! This module defines the error hierarchy for Tether. Request errors (bad
//! declarations), internal errors (registry invariant violations) and
//! resolution errors are kept apart so callers can alert on the second kind
//! instead of only reporting bad configuration.
//!
//! Validation findings are not errors; see [`crate::domain::diagnostics`].

use thiserror::Error;

/// Main Tether error type
///
/// This is the primary error type used throughout the library.
#[derive(Debug, Error)]
pub enum TetherError {
    /// A declaration named a connection type the registry does not know
    #[error("Unknown connection type: {0}")]
    UnknownConnectionType(String),

    /// Registry or factory invariant violation
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Resolution of a connection failed
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolveError),

    /// Validation errors outside of diagnostic reporting
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl TetherError {
    /// Returns true for errors caused by bad input rather than a defect
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            TetherError::UnknownConnectionType(_)
                | TetherError::Configuration(_)
                | TetherError::Validation(_)
        )
    }

    /// Returns true for registry/factory invariant violations
    pub fn is_internal(&self) -> bool {
        matches!(self, TetherError::Internal(_))
    }
}

/// Connection resolution errors
///
/// Always fatal to the `resolve` call that produced them. Each variant names
/// the step that failed and keeps the underlying cause as text.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Credential file exists but could not be read
    #[error("Failed to read credentials file {path}: {reason}")]
    CredentialsRead { path: String, reason: String },

    /// Credential file could not be parsed
    #[error("Failed to parse credentials file {path}: {reason}")]
    CredentialsParse { path: String, reason: String },

    /// Token source or token exchange failed
    #[error("Token exchange failed ({step}): {reason}")]
    TokenExchange { step: String, reason: String },

    /// A named credentials profile was not present
    #[error("Profile '{profile}' not found in {path}")]
    ProfileNotFound { profile: String, path: String },

    /// Resolution was cancelled by the caller
    #[error("Resolution cancelled during {0}")]
    Cancelled(String),

    /// Resolution exceeded the caller's deadline
    #[error("Resolution deadline exceeded during {0}")]
    DeadlineExceeded(String),
}

impl ResolveError {
    /// Creates a token exchange error for the given step
    pub fn token_exchange(step: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ResolveError::TokenExchange {
            step: step.into(),
            reason: reason.to_string(),
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for TetherError {
    fn from(err: std::io::Error) -> Self {
        TetherError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for TetherError {
    fn from(err: serde_json::Error) -> Self {
        TetherError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for TetherError {
    fn from(err: toml::de::Error) -> Self {
        TetherError::Configuration(format!("TOML parse error: {err}"))
    }
}
