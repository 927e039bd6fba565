//! Resolve command implementation
//!
//! Resolves one connection from the workspace and prints its value as JSON.
//! Secret fields are masked unless `--show-secrets` is given.

use crate::connection::Connection;
use crate::workspace::Workspace;
use clap::Args;
use tokio::sync::watch;

const MASK: &str = "********";

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Connection to resolve, e.g. `slack.team` or `connection.aws.default`
    pub name: String,

    /// Print secret fields in clear text
    #[arg(long)]
    pub show_secrets: bool,
}

impl ResolveArgs {
    /// Execute the resolve command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let workspace = match Workspace::load(config_path) {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("❌ Failed to load configuration file");
                eprintln!("   Error: {e}");
                return Ok(2);
            }
        };
        if workspace.diagnostics().has_errors() {
            eprintln!("{}", workspace.diagnostics());
        }

        let ctx = workspace.resolve_context().with_shutdown(shutdown_signal);
        let resolved = match workspace.resolve(&self.name, &ctx).await {
            Ok(resolved) => resolved,
            Err(e) if e.is_request_error() => {
                eprintln!("❌ {e}");
                return Ok(2);
            }
            Err(e) => {
                eprintln!("❌ Failed to resolve {}", self.name);
                eprintln!("   Error: {e}");
                return Ok(3);
            }
        };

        let json = render(resolved.as_ref(), self.show_secrets)?;
        println!("{}", serde_json::to_string_pretty(&json)?);
        Ok(0)
    }
}

/// JSON projection of `connection`, with secrets masked unless `show_secrets`
fn render(connection: &dyn Connection, show_secrets: bool) -> anyhow::Result<serde_json::Value> {
    let mut json = connection.value()?.to_json()?;
    if show_secrets {
        return Ok(json);
    }

    let secrets = connection.secret_fields();
    if let Some(fields) = json.as_object_mut() {
        for field in secrets {
            if let Some(value) = fields.get_mut(*field) {
                if !value.is_null() {
                    *value = serde_json::Value::from(MASK);
                }
            }
        }
        // env values mirror the fields above
        if let Some(serde_json::Value::Object(env)) = fields.get_mut("env") {
            for value in env.values_mut() {
                *value = serde_json::Value::from(MASK);
            }
        }
    }
    Ok(json)
}
