//! Subscriber setup for the `tether` binary
//!
//! Human-readable events go to stderr so that `tether` output on stdout stays
//! machine-parseable. When `[logging] local_enabled` is set, a JSON file sink
//! is added under `local_path`. The file sink always records resolution
//! events (target [`RESOLVE_TARGET`]) at `info` or finer, even when the
//! console is quieter, so the file doubles as a resolution audit trail.
//!
//! `RUST_LOG` replaces the computed directives for both sinks.

use crate::config::LoggingConfig;
use crate::domain::{Result, TetherError};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Target used by the resolution logging macros
pub const RESOLVE_TARGET: &str = "tether::resolve";

/// File name prefix for the rolling JSON log
pub const LOG_FILE_PREFIX: &str = "tether.log";

/// Keeps the non-blocking file writer alive; drop it last to flush
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Rolling JSON file sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSink {
    pub directory: PathBuf,
    pub rotation: Rotation,
}

/// Resolved logging settings: a console level plus an optional file sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub file: Option<FileSink>,
}

impl LogSettings {
    /// Combine the CLI/application level with the `[logging]` table
    pub fn new(level: &str, config: &LoggingConfig) -> Result<Self> {
        let level = Level::from_str(level.trim()).map_err(|_| {
            TetherError::Configuration(format!(
                "Invalid log level '{level}'. Must be one of: trace, debug, info, warn, error"
            ))
        })?;

        let file = config.local_enabled.then(|| FileSink {
            directory: PathBuf::from(&config.local_path),
            rotation: rotation_for(&config.local_rotation),
        });

        Ok(Self { level, file })
    }

    /// Directives for the stderr sink
    pub fn console_directives(&self) -> String {
        format!("tether={}", self.level)
    }

    /// Directives for the file sink; resolution events never drop below `info`
    pub fn file_directives(&self) -> String {
        let resolve_level = self.level.max(Level::INFO);
        format!("tether={},{}={}", self.level, RESOLVE_TARGET, resolve_level)
    }
}

fn rotation_for(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

fn filter(directives: String) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

/// Install the global subscriber
///
/// # Example
///
/// ```no_run
/// use tether::config::LoggingConfig;
/// use tether::logging::{init_logging, LogSettings};
///
/// let settings = LogSettings::new("warn", &LoggingConfig::default()).unwrap();
/// let _guard = init_logging(&settings).unwrap();
/// ```
pub fn init_logging(settings: &LogSettings) -> Result<LoggingGuard> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter(settings.console_directives()))
        .boxed();

    let mut layers = vec![console_layer];
    let mut file_guard = None;

    if let Some(sink) = &settings.file {
        std::fs::create_dir_all(&sink.directory).map_err(|e| {
            TetherError::Configuration(format!(
                "Failed to create log directory {}: {e}",
                sink.directory.display()
            ))
        })?;

        let appender =
            RollingFileAppender::new(sink.rotation.clone(), &sink.directory, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);

        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(writer)
                .with_filter(filter(settings.file_directives()))
                .boxed(),
        );
    }

    tracing_subscriber::registry().with(layers).init();

    tracing::debug!(
        level = %settings.level,
        file = ?settings.file.as_ref().map(|sink| sink.directory.display().to_string()),
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
