//! Validate config command implementation
//!
//! This module implements the `validate-config` command: load the
//! configuration, build the workspace and report every diagnostic.

use crate::workspace::Workspace;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let workspace = match Workspace::load(config_path) {
            Ok(ws) => {
                println!("✅ Configuration file loaded successfully");
                ws
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let diagnostics = workspace.diagnostics();
        if !diagnostics.is_empty() {
            println!("❌ Configuration has {} problem(s)", diagnostics.len());
            for diagnostic in diagnostics {
                println!("   {diagnostic}");
            }
            println!();
            return Ok(2);
        }

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Connections: {}", workspace.connections().count());
        for connection in workspace.connections() {
            let identity = connection.identity();
            let origin = if identity.decl_range.is_some() {
                "declared"
            } else {
                "default"
            };
            println!("    {} ({origin})", identity.unqualified_name);
        }
        println!("  Imports: {}", workspace.imports().len());
        println!("  Params: {}", workspace.params().len());
        for param in workspace.params() {
            println!("    {}: {}", param.name, param.declared);
        }
        println!();
        Ok(0)
    }
}
