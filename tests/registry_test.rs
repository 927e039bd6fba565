//! Integration tests for the connection registry

use tether::connection::{ConnectionRegistry, ConnectionType, ResolveContext};
use tether::domain::{ConnectionName, TetherError};
use tether::value::{is_capsule_type, is_list_of_capsule, encapsulated_discriminator, Type};
use std::collections::HashMap;
use std::sync::Arc;

#[test]
fn test_default_connections_one_per_discriminator() {
    let mut registry = ConnectionRegistry::new();
    let defaults = registry.default_connections().unwrap();

    let discriminators: Vec<&str> = registry.discriminators().collect();
    assert_eq!(defaults.len(), discriminators.len());
    for discriminator in discriminators {
        let connection = &defaults[discriminator];
        assert_eq!(connection.identity().short_name.as_str(), "default");
        assert_eq!(
            connection.identity().full_name,
            format!("connection.{discriminator}.default")
        );
    }

    let known: Vec<&str> = registry.known_connection_types().collect();
    assert_eq!(known.len(), ConnectionType::ALL.len());
}

#[test]
fn test_unknown_discriminator_is_request_error() {
    let err = ConnectionRegistry::new()
        .instantiate("bitbucket", ConnectionName::default_name(), None)
        .unwrap_err();
    assert!(matches!(err, TetherError::UnknownConnectionType(_)));
    assert!(err.is_request_error());
}

#[test]
fn test_capsule_introspection() {
    let registry = ConnectionRegistry::new();

    let single = Type::parse("connection.okta", &registry).unwrap();
    assert!(is_capsule_type(&single));
    assert!(!is_list_of_capsule(&single));
    assert_eq!(encapsulated_discriminator(&single).unwrap(), "okta");

    let list = Type::parse("list(connection.okta)", &registry).unwrap();
    assert!(!is_capsule_type(&list));
    assert!(is_list_of_capsule(&list));

    assert!(encapsulated_discriminator(&Type::String).is_err());
}

#[tokio::test]
async fn test_defaults_resolve_concurrently() {
    let mut registry = ConnectionRegistry::new();
    let defaults = registry.default_connections().unwrap();

    let vars: HashMap<String, String> = [("GITHUB_TOKEN", "ghp_x"), ("GITLAB_TOKEN", "glpat_y")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let home = tempfile::TempDir::new().unwrap();
    let ctx = ResolveContext::new()
        .with_vars(Arc::new(vars))
        .with_home_dir(Some(home.path().to_path_buf()));

    let results = futures::future::join_all(defaults.values().map(|c| c.resolve(&ctx))).await;
    assert_eq!(results.len(), defaults.len());
    for result in results {
        let resolved = result.unwrap();
        let ttl = resolved.ttl();
        assert!(ttl == -1 || ttl == 300, "unexpected ttl {ttl}");
    }
}
