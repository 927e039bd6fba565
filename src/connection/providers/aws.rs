//! AWS connection
//!
//! Resolution order when the key pair is not declared:
//!
//! 1. A profile (declared, or `AWS_PROFILE`) selects a section of the shared
//!    credentials file (`AWS_SHARED_CREDENTIALS_FILE`, else `~/.aws/credentials`).
//!    Only unset keys are taken from the section. A missing file falls
//!    through to step 2.
//! 2. Otherwise `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
//!    `AWS_SESSION_TOKEN` fill whichever fields are unset
//!
//! Session credentials are short-lived, so resolved instances carry a TTL of
//! [`DEFAULT_TTL_SECONDS`] unless the declaration overrides it.

use crate::config::{secret_string, secret_string_opt, SecretString};
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

pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const AWS_PROFILE: &str = "AWS_PROFILE";
pub const AWS_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsFields {
    pub access_key: Option<SecretString>,
    pub secret_key: Option<SecretString>,
    pub session_token: Option<SecretString>,
    pub profile: Option<String>,
    pub ttl: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct AwsConnection {
    identity: ConnectionIdentity,
    fields: AwsFields,
    /// Environment variables whose values came from the shared credentials file
    file_sourced: Vec<&'static str>,
}

impl AwsConnection {
    pub fn new(identity: ConnectionIdentity, fields: AwsFields) -> Self {
        Self {
            identity,
            fields,
            file_sourced: Vec::new(),
        }
    }

    pub fn fields(&self) -> &AwsFields {
        &self.fields
    }

    pub(crate) fn from_attributes(
        identity: ConnectionIdentity,
        attrs: &BTreeMap<String, Value>,
    ) -> Result<Box<dyn Connection>> {
        Ok(Box::new(Self::new(identity, decode_fields(attrs)?)))
    }

    fn credentials_path(ctx: &ResolveContext) -> Option<PathBuf> {
        ctx.non_empty_var(AWS_SHARED_CREDENTIALS_FILE)
            .map(PathBuf::from)
            .or_else(|| ctx.home_dir().map(|home| home.join(".aws").join("credentials")))
    }

    async fn resolve_profile(
        &self,
        ctx: &ResolveContext,
        profile: String,
    ) -> std::result::Result<Self, ResolveError> {
        let Some(path) = Self::credentials_path(ctx).filter(|path| path.is_file()) else {
            tracing::debug!(
                connection = %self.identity,
                profile = %profile,
                "No shared credentials file, reading keys from environment"
            );
            return Ok(self.resolve_env(ctx));
        };

        tracing::debug!(
            connection = %self.identity,
            profile = %profile,
            path = %path.display(),
            "Reading shared credentials profile"
        );
        let contents = ctx
            .run_step("read shared credentials", read_credentials(&path))
            .await?;
        let mut sections = parse_shared_credentials(&contents);
        let mut section =
            sections
                .remove(&profile)
                .ok_or_else(|| ResolveError::ProfileNotFound {
                    profile: profile.clone(),
                    path: path.display().to_string(),
                })?;

        let mut resolved = self.clone();
        let keys = [
            (&mut resolved.fields.access_key, "aws_access_key_id", AWS_ACCESS_KEY_ID),
            (&mut resolved.fields.secret_key, "aws_secret_access_key", AWS_SECRET_ACCESS_KEY),
            (&mut resolved.fields.session_token, "aws_session_token", AWS_SESSION_TOKEN),
        ];
        for (field, key, var) in keys {
            if field.is_some() {
                continue;
            }
            if let Some(value) = section.remove(key) {
                *field = Some(secret_string(value));
                resolved.file_sourced.push(var);
            }
        }
        resolved.fields.profile = Some(profile);
        Ok(resolved)
    }

    fn resolve_env(&self, ctx: &ResolveContext) -> Self {
        let mut resolved = self.clone();
        let fields = &mut resolved.fields;
        if fields.access_key.is_none() {
            fields.access_key = Some(secret_string(ctx.var(AWS_ACCESS_KEY_ID)));
        }
        if fields.secret_key.is_none() {
            fields.secret_key = Some(secret_string(ctx.var(AWS_SECRET_ACCESS_KEY)));
        }
        if fields.session_token.is_none() {
            fields.session_token = secret_string_opt(ctx.non_empty_var(AWS_SESSION_TOKEN));
        }
        resolved
    }
}

#[async_trait]
impl Connection for AwsConnection {
    fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Aws
    }

    async fn resolve(&self, ctx: &ResolveContext) -> Result<Box<dyn Connection>> {
        if self.fields.access_key.is_some() && self.fields.secret_key.is_some() {
            return Ok(self.clone_box());
        }

        let profile = self
            .fields
            .profile
            .clone()
            .or_else(|| ctx.non_empty_var(AWS_PROFILE));
        let resolved = match profile {
            Some(profile) => self.resolve_profile(ctx, profile).await?,
            None => self.resolve_env(ctx),
        };
        Ok(Box::new(resolved))
    }

    fn equals(&self, other: Option<&dyn Connection>) -> bool {
        same_variant::<Self>(other).is_some_and(|other| {
            secret_eq(&self.fields.access_key, &other.fields.access_key)
                && secret_eq(&self.fields.secret_key, &other.fields.secret_key)
                && secret_eq(&self.fields.session_token, &other.fields.session_token)
                && self.fields.profile == other.fields.profile
                && self.fields.ttl == other.fields.ttl
        })
    }

    fn ttl(&self) -> i64 {
        self.fields.ttl.unwrap_or(DEFAULT_TTL_SECONDS)
    }

    fn value(&self) -> Result<Value> {
        let access_key = expose(&self.fields.access_key);
        let secret_key = expose(&self.fields.secret_key);
        let session_token = expose(&self.fields.session_token);
        let profile = self.fields.profile.as_deref();

        let mut builder = ValueBuilder::new(&self.identity, ConnectionType::Aws)
            .field("access_key", access_key)
            .field("secret_key", secret_key)
            .field("session_token", session_token)
            .field("profile", profile)
            .number("ttl", self.fields.ttl)
            .env(AWS_PROFILE, profile);
        for (var, value) in [
            (AWS_ACCESS_KEY_ID, access_key),
            (AWS_SECRET_ACCESS_KEY, secret_key),
            (AWS_SESSION_TOKEN, session_token),
        ] {
            if !self.file_sourced.contains(&var) {
                builder = builder.env(var, value);
            }
        }
        Ok(builder.build())
    }

    fn secret_fields(&self) -> &'static [&'static str] {
        &["access_key", "secret_key", "session_token"]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }
}

async fn read_credentials(path: &Path) -> std::result::Result<String, ResolveError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ResolveError::CredentialsRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Parses an INI-style shared credentials file into sections of key/value pairs
///
/// `[profile name]` headers are accepted as well as `[name]`. Comment lines
/// start with `#` or `;`.
pub fn parse_shared_credentials(contents: &str) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let header = header.trim();
            let name = header.strip_prefix("profile ").unwrap_or(header).trim();
            sections.entry(name.to_string()).or_default();
            current = Some(name.to_string());
            continue;
        }

        if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    sections
}
