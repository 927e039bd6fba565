//! Integration tests for connection resolution
//!
//! Tests that read the process environment hold `ENV_MUTEX`; everything else
//! resolves against an explicit variable map and a temporary home directory.

use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tether::config::secret_string;
use tether::connection::providers::{
    AwsConnection, AwsFields, GcpConnection, GcpFields, OktaConnection, OktaFields,
    SlackConnection,
};
use tether::connection::{connections_equal, Connection, ConnectionRegistry, ResolveContext};
use tether::domain::{ConnectionIdentity, ConnectionName, ResolveError, TetherError};
use tether::value::Value;
use tokio::sync::watch;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn identity(connection_type: &str, name: &str) -> ConnectionIdentity {
    ConnectionIdentity::new(connection_type, ConnectionName::new(name).unwrap(), None)
}

fn isolated_ctx(pairs: &[(&str, &str)], home: &TempDir) -> ResolveContext {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ResolveContext::new()
        .with_vars(Arc::new(vars))
        .with_home_dir(Some(home.path().to_path_buf()))
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn write_authorized_user(home: &TempDir, token_uri: &str) -> std::path::PathBuf {
    let path = home.path().join("user.json");
    std::fs::write(
        &path,
        json!({
            "type": "authorized_user",
            "client_id": "client",
            "client_secret": "secret",
            "refresh_token": "1//refresh",
            "quota_project_id": "billing-project",
            "token_uri": token_uri,
        })
        .to_string(),
    )
    .unwrap();
    path
}

#[tokio::test]
async fn test_slack_token_from_process_environment() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let declared = SlackConnection::new(identity("slack", "default"));

    std::env::remove_var("SLACK_TOKEN");
    let resolved = declared.resolve(&ResolveContext::new()).await.unwrap();
    assert_eq!(str_field(&resolved.value().unwrap(), "token"), Some(""));

    std::env::set_var("SLACK_TOKEN", "foobar");
    let resolved = declared.resolve(&ResolveContext::new()).await.unwrap();
    assert_eq!(str_field(&resolved.value().unwrap(), "token"), Some("foobar"));
    std::env::remove_var("SLACK_TOKEN");

    // the receiver is untouched
    assert!(declared.token().is_none());
}

#[tokio::test]
async fn test_okta_fills_from_environment_when_undeclared() {
    let home = TempDir::new().unwrap();
    let ctx = isolated_ctx(
        &[("OKTA_TOKEN", "00abc"), ("OKTA_ORGURL", "https://example.okta.com")],
        &home,
    );

    let resolved = OktaConnection::new(identity("okta", "default"), OktaFields::default())
        .resolve(&ctx)
        .await
        .unwrap();
    let value = resolved.value().unwrap();
    assert_eq!(str_field(&value, "token"), Some("00abc"));
    assert_eq!(str_field(&value, "domain"), Some("https://example.okta.com"));

    let env = value.get("env").and_then(Value::as_map).unwrap();
    assert_eq!(env.get("OKTA_TOKEN"), Some(&Value::from("00abc")));
    assert_eq!(
        env.get("OKTA_ORGURL"),
        Some(&Value::from("https://example.okta.com"))
    );
}

#[tokio::test]
async fn test_okta_partial_declaration_is_kept() {
    let home = TempDir::new().unwrap();
    let ctx = isolated_ctx(&[("OKTA_TOKEN", "from-env")], &home);
    let declared = OktaConnection::new(
        identity("okta", "corp"),
        OktaFields {
            token: None,
            domain: Some("https://corp.okta.com".to_string()),
        },
    );

    let resolved = declared.resolve(&ctx).await.unwrap();
    assert!(resolved.equals(Some(&declared)));
    assert_eq!(resolved.value().unwrap().get("token"), Some(&Value::Null));
}

#[tokio::test]
async fn test_gcp_authorized_user_exchange() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .match_body(mockito::Matcher::UrlEncoded(
            "grant_type".into(),
            "refresh_token".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"ya29.integration","expires_in":3599}"#)
        .create_async()
        .await;

    let home = TempDir::new().unwrap();
    let path = write_authorized_user(&home, &format!("{}/token", server.url()));
    let ctx = isolated_ctx(&[("GOOGLE_APPLICATION_CREDENTIALS", path.to_str().unwrap())], &home);

    let resolved = GcpConnection::new(identity("gcp", "default"), GcpFields::default())
        .resolve(&ctx)
        .await
        .unwrap();
    mock.assert_async().await;

    let value = resolved.value().unwrap();
    assert_eq!(str_field(&value, "access_token"), Some("ya29.integration"));
    assert_eq!(str_field(&value, "project"), Some("billing-project"));
    assert_eq!(resolved.ttl(), 300);
}

#[tokio::test]
async fn test_gcp_token_endpoint_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create_async()
        .await;

    let home = TempDir::new().unwrap();
    let path = write_authorized_user(&home, &format!("{}/token", server.url()));
    let ctx = isolated_ctx(&[("GOOGLE_APPLICATION_CREDENTIALS", path.to_str().unwrap())], &home);

    let err = GcpConnection::new(identity("gcp", "default"), GcpFields::default())
        .resolve(&ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TetherError::Resolution(ResolveError::TokenExchange { .. })
    ));
}

#[tokio::test]
async fn test_ttl_per_provider() {
    let home = TempDir::new().unwrap();
    let ctx = isolated_ctx(&[], &home);
    let mut registry = ConnectionRegistry::new();

    for (discriminator, connection) in registry.default_connections().unwrap() {
        let resolved = connection.resolve(&ctx).await.unwrap();
        let expected = if discriminator == "aws" || discriminator == "gcp" {
            300
        } else {
            -1
        };
        assert_eq!(resolved.ttl(), expected, "ttl for {discriminator}");
    }

    let overridden = AwsConnection::new(
        identity("aws", "short"),
        AwsFields {
            access_key: Some(secret_string("AKIA".to_string())),
            secret_key: Some(secret_string("shh".to_string())),
            ttl: Some(60),
            ..AwsFields::default()
        },
    );
    assert_eq!(overridden.resolve(&ctx).await.unwrap().ttl(), 60);
}

#[test]
fn test_equality_properties() {
    let a = SlackConnection::new(identity("slack", "a"))
        .with_token("t");
    let b = SlackConnection::new(identity("slack", "b"))
        .with_token("t");
    let c = SlackConnection::new(identity("slack", "c"))
        .with_token("u");
    let okta = OktaConnection::new(identity("okta", "a"), OktaFields::default());

    // reflexive and symmetric over provider fields, names excluded
    assert!(a.equals(Some(&a)));
    assert!(a.equals(Some(&b)) && b.equals(Some(&a)));
    assert!(!a.equals(Some(&c)));

    // other variants and nil never compare equal
    assert!(!a.equals(Some(&okta)));
    assert!(!a.equals(None));
    assert!(connections_equal(None, None));
    assert!(!connections_equal(Some(&a), None));
}

#[tokio::test]
async fn test_resolve_after_shutdown_is_cancelled() {
    let home = TempDir::new().unwrap();
    let path = write_authorized_user(&home, "http://127.0.0.1:9/token");
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let ctx = isolated_ctx(&[("GOOGLE_APPLICATION_CREDENTIALS", path.to_str().unwrap())], &home)
        .with_shutdown(rx);
    let err = GcpConnection::new(identity("gcp", "default"), GcpFields::default())
        .resolve(&ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TetherError::Resolution(ResolveError::Cancelled(_))
    ));
}

#[tokio::test]
async fn test_stalled_token_endpoint_hits_deadline() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let home = TempDir::new().unwrap();
    let path = write_authorized_user(&home, &format!("http://{addr}/token"));
    let ctx = isolated_ctx(&[("GOOGLE_APPLICATION_CREDENTIALS", path.to_str().unwrap())], &home)
        .with_timeout(Duration::from_millis(200));

    let err = GcpConnection::new(identity("gcp", "default"), GcpFields::default())
        .resolve(&ctx)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TetherError::Resolution(ResolveError::DeadlineExceeded(_))
    ));
}
