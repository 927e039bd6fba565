//! Single-token providers
//!
//! Messaging, alerting, issue-tracker and threat-intel providers that need
//! exactly one secret share [`TokenConnection`], parameterised by a marker
//! type naming the attribute and the environment variable it falls back to.

use crate::config::{secret_string, SecretString};
use crate::connection::{
    expose, same_variant, secret_eq, Connection, ConnectionType, ResolveContext, ValueBuilder,
    NO_EXPIRY,
};
use crate::domain::{ConnectionIdentity, Result, TetherError};
use crate::value::Value;
use async_trait::async_trait;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Static description of a single-token provider
pub trait TokenProvider: fmt::Debug + Clone + Copy + Default + Send + Sync + 'static {
    const TYPE: ConnectionType;
    /// Attribute holding the token
    const FIELD: &'static str;
    /// Environment variable read when the attribute is unset
    const ENV_VAR: &'static str;
    const SECRET_FIELDS: &'static [&'static str] = &[Self::FIELD];
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Slack;

impl TokenProvider for Slack {
    const TYPE: ConnectionType = ConnectionType::Slack;
    const FIELD: &'static str = "token";
    const ENV_VAR: &'static str = "SLACK_TOKEN";
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Github;

impl TokenProvider for Github {
    const TYPE: ConnectionType = ConnectionType::Github;
    const FIELD: &'static str = "token";
    const ENV_VAR: &'static str = "GITHUB_TOKEN";
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Gitlab;

impl TokenProvider for Gitlab {
    const TYPE: ConnectionType = ConnectionType::Gitlab;
    const FIELD: &'static str = "token";
    const ENV_VAR: &'static str = "GITLAB_TOKEN";
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pagerduty;

impl TokenProvider for Pagerduty {
    const TYPE: ConnectionType = ConnectionType::Pagerduty;
    const FIELD: &'static str = "token";
    const ENV_VAR: &'static str = "PAGERDUTY_TOKEN";
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Teams;

impl TokenProvider for Teams {
    const TYPE: ConnectionType = ConnectionType::Teams;
    const FIELD: &'static str = "access_token";
    const ENV_VAR: &'static str = "TEAMS_ACCESS_TOKEN";
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Virustotal;

impl TokenProvider for Virustotal {
    const TYPE: ConnectionType = ConnectionType::Virustotal;
    const FIELD: &'static str = "api_key";
    const ENV_VAR: &'static str = "VTCLI_APIKEY";
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Abuseipdb;

impl TokenProvider for Abuseipdb {
    const TYPE: ConnectionType = ConnectionType::Abuseipdb;
    const FIELD: &'static str = "api_key";
    const ENV_VAR: &'static str = "ABUSEIPDB_API_KEY";
}

pub type SlackConnection = TokenConnection<Slack>;
pub type GithubConnection = TokenConnection<Github>;
pub type GitlabConnection = TokenConnection<Gitlab>;
pub type PagerdutyConnection = TokenConnection<Pagerduty>;
pub type TeamsConnection = TokenConnection<Teams>;
pub type VirustotalConnection = TokenConnection<Virustotal>;
pub type AbuseipdbConnection = TokenConnection<Abuseipdb>;

/// Connection holding one optional token
#[derive(Debug, Clone)]
pub struct TokenConnection<P: TokenProvider> {
    identity: ConnectionIdentity,
    token: Option<SecretString>,
    provider: PhantomData<P>,
}

impl<P: TokenProvider> TokenConnection<P> {
    pub fn new(identity: ConnectionIdentity) -> Self {
        Self {
            identity,
            token: None,
            provider: PhantomData,
        }
    }

    /// Declares the token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(secret_string(token.into()));
        self
    }

    pub fn token(&self) -> Option<&str> {
        expose(&self.token)
    }

    /// Factory entry: binds the token attribute, rejecting anything else
    pub(crate) fn from_attributes(
        identity: ConnectionIdentity,
        attrs: &BTreeMap<String, Value>,
    ) -> Result<Box<dyn Connection>> {
        if let Some(unknown) = attrs.keys().find(|k| k.as_str() != P::FIELD) {
            return Err(TetherError::Configuration(format!(
                "Unsupported attribute '{unknown}' for {} connection",
                P::TYPE
            )));
        }

        let mut connection = Self::new(identity);
        match attrs.get(P::FIELD) {
            None | Some(Value::Null) => {}
            Some(Value::String(token)) => connection = connection.with_token(token.clone()),
            Some(other) => {
                return Err(TetherError::Configuration(format!(
                    "Attribute '{}' must be a string, found {}",
                    P::FIELD,
                    other.type_of()
                )))
            }
        }
        Ok(Box::new(connection))
    }
}

#[async_trait]
impl<P: TokenProvider> Connection for TokenConnection<P> {
    fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    fn connection_type(&self) -> ConnectionType {
        P::TYPE
    }

    async fn resolve(&self, ctx: &ResolveContext) -> Result<Box<dyn Connection>> {
        if self.token.is_some() {
            return Ok(self.clone_box());
        }

        tracing::debug!(
            connection = %self.identity,
            env_var = P::ENV_VAR,
            "Resolving token from environment"
        );
        let mut resolved = self.clone();
        resolved.token = Some(secret_string(ctx.var(P::ENV_VAR)));
        Ok(Box::new(resolved))
    }

    fn equals(&self, other: Option<&dyn Connection>) -> bool {
        same_variant::<Self>(other).is_some_and(|other| secret_eq(&self.token, &other.token))
    }

    fn ttl(&self) -> i64 {
        NO_EXPIRY
    }

    fn value(&self) -> Result<Value> {
        let token = self.token();
        Ok(ValueBuilder::new(&self.identity, P::TYPE)
            .field(P::FIELD, token)
            .env(P::ENV_VAR, token)
            .build())
    }

    fn secret_fields(&self) -> &'static [&'static str] {
        P::SECRET_FIELDS
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }
}
