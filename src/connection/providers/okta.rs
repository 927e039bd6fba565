//! Okta connection

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

pub const OKTA_TOKEN: &str = "OKTA_TOKEN";
pub const OKTA_ORGURL: &str = "OKTA_ORGURL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OktaFields {
    pub token: Option<SecretString>,
    pub domain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OktaConnection {
    identity: ConnectionIdentity,
    fields: OktaFields,
}

impl OktaConnection {
    pub fn new(identity: ConnectionIdentity, fields: OktaFields) -> Self {
        Self { identity, fields }
    }

    pub fn fields(&self) -> &OktaFields {
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
impl Connection for OktaConnection {
    fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Okta
    }

    async fn resolve(&self, ctx: &ResolveContext) -> Result<Box<dyn Connection>> {
        if self.fields.token.is_some() || self.fields.domain.is_some() {
            return Ok(self.clone_box());
        }

        tracing::debug!(connection = %self.identity, "Resolving Okta credentials from environment");
        Ok(Box::new(Self {
            identity: self.identity.clone(),
            fields: OktaFields {
                token: Some(secret_string(ctx.var(OKTA_TOKEN))),
                domain: Some(ctx.var(OKTA_ORGURL)),
            },
        }))
    }

    fn equals(&self, other: Option<&dyn Connection>) -> bool {
        same_variant::<Self>(other).is_some_and(|other| {
            secret_eq(&self.fields.token, &other.fields.token)
                && self.fields.domain == other.fields.domain
        })
    }

    fn ttl(&self) -> i64 {
        NO_EXPIRY
    }

    fn value(&self) -> Result<Value> {
        let token = expose(&self.fields.token);
        let domain = self.fields.domain.as_deref();
        Ok(ValueBuilder::new(&self.identity, ConnectionType::Okta)
            .field("token", token)
            .field("domain", domain)
            .env(OKTA_TOKEN, token)
            .env(OKTA_ORGURL, domain)
            .build())
    }

    fn secret_fields(&self) -> &'static [&'static str] {
        &["token"]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }
}
