//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod providers;
pub mod resolve;
pub mod validate;
