//! Domain types shared across Tether.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`ConnectionName`], [`ConnectionIdentity`])
//! - **Diagnostics** ([`Diagnostic`], [`Diagnostics`], [`SourceRange`])
//! - **Error types** ([`TetherError`], [`ResolveError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, TetherError>`]. Validation
//! never fails this way; it returns [`Diagnostics`] instead.
//!
//! ```rust
//! use tether::domain::{ConnectionName, Result, TetherError};
//!
//! fn parse(name: &str) -> Result<ConnectionName> {
//!     ConnectionName::new(name).map_err(TetherError::Validation)
//! }
//! # assert!(parse("default").is_ok());
//! ```

pub mod diagnostics;
pub mod errors;
pub mod ids;
pub mod result;

// Re-export commonly used types for convenience
pub use diagnostics::{Diagnostic, Diagnostics, Pos, Severity, SourceRange};
pub use errors::{ResolveError, TetherError};
pub use ids::{ConnectionIdentity, ConnectionName};
pub use result::Result;
