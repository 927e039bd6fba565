//! Jira connection

use crate::config::{secret_string, SecretString};
use crate::connection::block::decode_fields;
use crate::connection::{
    expose, same_variant, secret_eq, Connection, ConnectionType, ResolveContext, ValueBuilder,
    NO_EXPIRY,
};
use crate::domain::{ConnectionIdentity, Result};
use crate::value::Value;
use async_trait::async_trait;
use serde::Deserialize;
use std::any::Any;
use std::collections::BTreeMap;

pub const JIRA_API_TOKEN: &str = "JIRA_API_TOKEN";
/// Older name for [`JIRA_API_TOKEN`], read only when the newer one is unset
pub const JIRA_TOKEN: &str = "JIRA_TOKEN";
pub const JIRA_URL: &str = "JIRA_URL";
pub const JIRA_USER: &str = "JIRA_USER";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JiraFields {
    pub api_token: Option<SecretString>,
    pub base_url: Option<String>,
    pub username: Option<String>,
}

impl JiraFields {
    fn all_unset(&self) -> bool {
        self.api_token.is_none() && self.base_url.is_none() && self.username.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct JiraConnection {
    identity: ConnectionIdentity,
    fields: JiraFields,
}

impl JiraConnection {
    pub fn new(identity: ConnectionIdentity, fields: JiraFields) -> Self {
        Self { identity, fields }
    }

    pub fn fields(&self) -> &JiraFields {
        &self.fields
    }

    pub(crate) fn from_attributes(
        identity: ConnectionIdentity,
        attrs: &BTreeMap<String, Value>,
    ) -> Result<Box<dyn Connection>> {
        Ok(Box::new(Self::new(identity, decode_fields(attrs)?)))
    }
}

#[async_trait]
impl Connection for JiraConnection {
    fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Jira
    }

    async fn resolve(&self, ctx: &ResolveContext) -> Result<Box<dyn Connection>> {
        // any declared field means the declaration is authoritative
        if !self.fields.all_unset() {
            return Ok(self.clone_box());
        }

        let token = ctx
            .non_empty_var(JIRA_API_TOKEN)
            .unwrap_or_else(|| ctx.var(JIRA_TOKEN));
        Ok(Box::new(Self {
            identity: self.identity.clone(),
            fields: JiraFields {
                api_token: Some(secret_string(token)),
                base_url: Some(ctx.var(JIRA_URL)),
                username: Some(ctx.var(JIRA_USER)),
            },
        }))
    }

    fn equals(&self, other: Option<&dyn Connection>) -> bool {
        same_variant::<Self>(other).is_some_and(|other| {
            secret_eq(&self.fields.api_token, &other.fields.api_token)
                && self.fields.base_url == other.fields.base_url
                && self.fields.username == other.fields.username
        })
    }

    fn ttl(&self) -> i64 {
        NO_EXPIRY
    }

    fn value(&self) -> Result<Value> {
        let token = expose(&self.fields.api_token);
        let base_url = self.fields.base_url.as_deref();
        let username = self.fields.username.as_deref();
        Ok(ValueBuilder::new(&self.identity, ConnectionType::Jira)
            .field("api_token", token)
            .field("base_url", base_url)
            .field("username", username)
            .env(JIRA_API_TOKEN, token)
            .env(JIRA_URL, base_url)
            .env(JIRA_USER, username)
            .build())
    }

    fn secret_fields(&self) -> &'static [&'static str] {
        &["api_token"]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }
}
