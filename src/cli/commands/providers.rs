//! Providers command implementation
//!
//! Lists every registered connection type with its capsule type and the TTL
//! of an undeclared instance.

use crate::connection::{ConnectionRegistry, NO_EXPIRY};
use crate::domain::ConnectionName;
use clap::Args;

/// Arguments for the providers command
#[derive(Args, Debug)]
pub struct ProvidersArgs {}

impl ProvidersArgs {
    /// Execute the providers command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let registry = ConnectionRegistry::new();
        for line in provider_lines(&registry)? {
            println!("{line}");
        }
        Ok(0)
    }
}

fn provider_lines(registry: &ConnectionRegistry) -> anyhow::Result<Vec<String>> {
    let mut lines = vec![format!("{:<12} {:<24} {}", "TYPE", "CAPSULE", "TTL")];
    for discriminator in registry.discriminators() {
        let connection = registry.instantiate(discriminator, ConnectionName::default_name(), None)?;
        let ttl = match connection.ttl() {
            NO_EXPIRY => "never".to_string(),
            seconds => format!("{seconds}s"),
        };
        let capsule = registry
            .capsule_type(discriminator)
            .map(|c| c.name().to_string())
            .unwrap_or_default();
        lines.push(format!("{discriminator:<12} {capsule:<24} {ttl}"));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_lines() {
        let lines = provider_lines(&ConnectionRegistry::new()).unwrap();
        assert_eq!(lines.len(), 14);
        assert!(lines.iter().any(|l| l.starts_with("aws ") && l.ends_with("300s")));
        assert!(lines.iter().any(|l| l.starts_with("slack ") && l.ends_with("never")));
        assert!(lines.iter().any(|l| l.contains("connection.gcp")));
    }
}
