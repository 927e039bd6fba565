// Tether - Typed Connection Runtime
// Copyright (c) 2025 Tether Contributors
// Licensed under the MIT License

//! # Tether - typed connections for workflow runtimes
//!
//! Tether models credentials for external providers (AWS, GCP, Azure, Slack,
//! GitHub, Jira and others) as typed, named *connections*. A connection
//! declared with missing fields is completed at run time from environment
//! variables or credential files, and connection values can be checked
//! against declared capsule types before anything runs.
//!
//! ## Overview
//!
//! - **Registry**: maps a discriminator such as `"aws"` to a factory and a
//!   capsule type, and synthesizes a `default` connection per provider
//! - **Resolution**: [`connection::Connection::resolve`] returns a new,
//!   fully populated instance and never mutates the receiver
//! - **Validation**: [`validate`] checks values and default-value trees
//!   against capsule types and reports [`domain::Diagnostics`]
//! - **Values**: [`value`] is the dynamic value model connections project into
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`connection`] - Connection trait, providers, registry and resolution context
//! - [`validate`] - Capsule type validator
//! - [`value`] - Dynamic values and types
//! - [`workspace`] - A loaded configuration with live connections
//! - [`domain`] - Identifiers, diagnostics and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tether::connection::{ConnectionRegistry, ResolveContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = ConnectionRegistry::new();
//!     let defaults = registry.default_connections()?;
//!
//!     let ctx = ResolveContext::new();
//!     let slack = defaults["slack"].resolve(&ctx).await?;
//!     println!("{}", slack.value()?.to_json()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Validation
//!
//! ```rust
//! use tether::connection::ConnectionRegistry;
//! use tether::validate::{validate_value, ValidationSubject};
//! use tether::value::{Type, Value};
//!
//! let registry = ConnectionRegistry::new();
//! let declared = Type::parse("connection.slack", &registry).unwrap();
//! let actual = Value::from_json(serde_json::json!({
//!     "resource_type": "connection",
//!     "type": "github",
//! }));
//!
//! let diags = validate_value(&ValidationSubject::new(declared, actual));
//! assert_eq!(diags.len(), 1);
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`domain::Result`]. Resolution failures are
//! wrapped as [`domain::TetherError::Resolution`] and carry the step that
//! failed; validation never fails this way and returns diagnostics instead.

pub mod cli;
pub mod config;
pub mod connection;
pub mod domain;
pub mod logging;
pub mod validate;
pub mod value;
pub mod workspace;
