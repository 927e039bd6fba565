//! Google Cloud connection
//!
//! When no access token is declared, the credentials file is located in
//! this order:
//!
//! 1. the declared `credentials` path
//! 2. `GOOGLE_APPLICATION_CREDENTIALS`
//! 3. `~/.config/gcloud/application_default_credentials.json`
//!
//! The first file that exists is read and exchanged for an access token. If
//! none exists the receiver is returned unchanged.

pub mod token;

use crate::config::{secret_string, SecretString};
use crate::connection::block::decode_fields;
use crate::connection::{
    expose, same_variant, secret_eq, Connection, ConnectionType, ResolveContext, ValueBuilder,
    DEFAULT_TTL_SECONDS,
};
use crate::domain::{ConnectionIdentity, ResolveError, Result};
use crate::value::Value;
use async_trait::async_trait;
use serde::Deserialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const CLOUDSDK_CORE_PROJECT: &str = "CLOUDSDK_CORE_PROJECT";
pub const CLOUDSDK_AUTH_ACCESS_TOKEN: &str = "CLOUDSDK_AUTH_ACCESS_TOKEN";

/// Location of application default credentials, relative to the home directory
pub const APPLICATION_DEFAULT_CREDENTIALS: &str = ".config/gcloud/application_default_credentials.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GcpFields {
    /// Path to a credentials file
    pub credentials: Option<String>,
    pub project: Option<String>,
    pub access_token: Option<SecretString>,
    pub ttl: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct GcpConnection {
    identity: ConnectionIdentity,
    fields: GcpFields,
    /// Set when the access token was minted from a credentials file
    from_file: bool,
}

impl GcpConnection {
    pub fn new(identity: ConnectionIdentity, fields: GcpFields) -> Self {
        Self {
            identity,
            fields,
            from_file: false,
        }
    }

    pub fn fields(&self) -> &GcpFields {
        &self.fields
    }

    pub(crate) fn from_attributes(
        identity: ConnectionIdentity,
        attrs: &BTreeMap<String, Value>,
    ) -> Result<Box<dyn Connection>> {
        Ok(Box::new(Self::new(identity, decode_fields(attrs)?)))
    }

    /// First existing credentials file, in lookup order
    fn locate_credentials(&self, ctx: &ResolveContext) -> Option<PathBuf> {
        let declared = self
            .fields
            .credentials
            .as_deref()
            .map(|path| expand_home(path, ctx.home_dir()));
        let from_env = ctx
            .non_empty_var(GOOGLE_APPLICATION_CREDENTIALS)
            .map(|path| expand_home(&path, ctx.home_dir()));
        let default = ctx
            .home_dir()
            .map(|home| home.join(APPLICATION_DEFAULT_CREDENTIALS));

        [declared, from_env, default]
            .into_iter()
            .flatten()
            .find(|path| path.is_file())
    }
}

fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

async fn read_credentials_file(path: &Path) -> std::result::Result<serde_json::Value, ResolveError> {
    let display = path.display().to_string();
    let contents =
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ResolveError::CredentialsRead {
                path: display.clone(),
                reason: e.to_string(),
            })?;
    let json: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| ResolveError::CredentialsParse {
            path: display.clone(),
            reason: e.to_string(),
        })?;
    if !json.is_object() {
        return Err(ResolveError::CredentialsParse {
            path: display,
            reason: "expected a JSON object".to_string(),
        });
    }
    Ok(json)
}

fn project_from_file(json: &serde_json::Value) -> Option<String> {
    ["project_id", "quota_project_id"]
        .into_iter()
        .filter_map(|key| json.get(key).and_then(serde_json::Value::as_str))
        .find(|project| !project.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl Connection for GcpConnection {
    fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Gcp
    }

    async fn resolve(&self, ctx: &ResolveContext) -> Result<Box<dyn Connection>> {
        if self.fields.access_token.is_some() {
            return Ok(self.clone_box());
        }

        let Some(path) = self.locate_credentials(ctx) else {
            tracing::debug!(connection = %self.identity, "No GCP credentials file found");
            return Ok(self.clone_box());
        };

        tracing::debug!(
            connection = %self.identity,
            path = %path.display(),
            "Reading GCP credentials"
        );
        let json = ctx
            .run_step("read credentials file", read_credentials_file(&path))
            .await?;

        let kind = json
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        let access_token = match kind {
            "service_account" => {
                ctx.run_step(
                    "service account token",
                    token::service_account_token(&json, ctx.http()),
                )
                .await?
            }
            "authorized_user" => {
                ctx.run_step(
                    "refresh token grant",
                    token::authorized_user_token(&json, ctx.http()),
                )
                .await?
            }
            other => {
                tracing::warn!(
                    connection = %self.identity,
                    credentials_type = other,
                    "Unrecognised credentials type, attempting authorization code exchange"
                );
                ctx.run_step(
                    "authorization code exchange",
                    token::authorization_code_token(&json, ctx.http()),
                )
                .await?
            }
        };

        let project = self
            .fields
            .project
            .clone()
            .or_else(|| ctx.non_empty_var(CLOUDSDK_CORE_PROJECT))
            .or_else(|| project_from_file(&json));

        Ok(Box::new(Self {
            identity: self.identity.clone(),
            fields: GcpFields {
                credentials: Some(path.display().to_string()),
                project,
                access_token: Some(secret_string(access_token)),
                ttl: self.fields.ttl,
            },
            from_file: true,
        }))
    }

    fn equals(&self, other: Option<&dyn Connection>) -> bool {
        same_variant::<Self>(other).is_some_and(|other| {
            self.fields.credentials == other.fields.credentials
                && self.fields.project == other.fields.project
                && secret_eq(&self.fields.access_token, &other.fields.access_token)
                && self.fields.ttl == other.fields.ttl
        })
    }

    fn ttl(&self) -> i64 {
        self.fields.ttl.unwrap_or(DEFAULT_TTL_SECONDS)
    }

    fn value(&self) -> Result<Value> {
        let access_token = expose(&self.fields.access_token);
        let project = self.fields.project.as_deref();
        let mut builder = ValueBuilder::new(&self.identity, ConnectionType::Gcp)
            .field("credentials", self.fields.credentials.as_deref())
            .field("project", project)
            .field("access_token", access_token)
            .number("ttl", self.fields.ttl);
        if !self.from_file {
            builder = builder
                .env(CLOUDSDK_AUTH_ACCESS_TOKEN, access_token)
                .env(CLOUDSDK_CORE_PROJECT, project);
        }
        Ok(builder.build())
    }

    fn secret_fields(&self) -> &'static [&'static str] {
        &["access_token"]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }
}
