//! Logging and observability
//!
//! Console logs on stderr, an optional rolling JSON file, and the macros the
//! workspace uses to record each resolution under [`RESOLVE_TARGET`].
//!
//! # Example
//!
//! ```no_run
//! use tether::config::LoggingConfig;
//! use tether::logging::{init_logging, LogSettings};
//!
//! let settings = LogSettings::new("info", &LoggingConfig::default()).unwrap();
//! let _guard = init_logging(&settings).unwrap();
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, FileSink, LogSettings, LoggingGuard, RESOLVE_TARGET};

/// Log the start of a connection resolution
///
/// # Example
///
/// ```no_run
/// use tether::log_resolve_start;
///
/// log_resolve_start!("connection.slack.team", "slack");
/// ```
#[macro_export]
macro_rules! log_resolve_start {
    ($connection:expr, $connection_type:expr) => {
        tracing::debug!(
            target: $crate::logging::RESOLVE_TARGET,
            connection = %$connection,
            connection_type = %$connection_type,
            "Resolving connection"
        );
    };
}

/// Log the completion of a connection resolution
///
/// # Example
///
/// ```no_run
/// use tether::log_resolve_complete;
/// use std::time::Duration;
///
/// log_resolve_complete!("connection.slack.team", -1, Duration::from_millis(3));
/// ```
#[macro_export]
macro_rules! log_resolve_complete {
    ($connection:expr, $ttl:expr, $duration:expr) => {
        tracing::info!(
            target: $crate::logging::RESOLVE_TARGET,
            connection = %$connection,
            ttl = $ttl,
            duration_ms = $duration.as_millis() as u64,
            "Connection resolved"
        );
    };
}

/// Log a failed resolution with context
///
/// # Example
///
/// ```no_run
/// use tether::log_error_with_context;
/// use tether::domain::TetherError;
///
/// let error = TetherError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            target: $crate::logging::RESOLVE_TARGET,
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
