//! Opsgenie connection

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

pub const OPSGENIE_ALERT_API_KEY: &str = "OPSGENIE_ALERT_API_KEY";
pub const OPSGENIE_INCIDENT_API_KEY: &str = "OPSGENIE_INCIDENT_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpsgenieFields {
    pub alert_api_key: Option<SecretString>,
    pub incident_api_key: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct OpsgenieConnection {
    identity: ConnectionIdentity,
    fields: OpsgenieFields,
}

impl OpsgenieConnection {
    pub fn new(identity: ConnectionIdentity, fields: OpsgenieFields) -> Self {
        Self { identity, fields }
    }

    pub fn fields(&self) -> &OpsgenieFields {
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
impl Connection for OpsgenieConnection {
    fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Opsgenie
    }

    async fn resolve(&self, ctx: &ResolveContext) -> Result<Box<dyn Connection>> {
        if self.fields.alert_api_key.is_some() || self.fields.incident_api_key.is_some() {
            return Ok(self.clone_box());
        }

        Ok(Box::new(Self {
            identity: self.identity.clone(),
            fields: OpsgenieFields {
                alert_api_key: Some(secret_string(ctx.var(OPSGENIE_ALERT_API_KEY))),
                incident_api_key: Some(secret_string(ctx.var(OPSGENIE_INCIDENT_API_KEY))),
            },
        }))
    }

    fn equals(&self, other: Option<&dyn Connection>) -> bool {
        same_variant::<Self>(other).is_some_and(|other| {
            secret_eq(&self.fields.alert_api_key, &other.fields.alert_api_key)
                && secret_eq(&self.fields.incident_api_key, &other.fields.incident_api_key)
        })
    }

    fn ttl(&self) -> i64 {
        NO_EXPIRY
    }

    fn value(&self) -> Result<Value> {
        let alert = expose(&self.fields.alert_api_key);
        let incident = expose(&self.fields.incident_api_key);
        Ok(ValueBuilder::new(&self.identity, ConnectionType::Opsgenie)
            .field("alert_api_key", alert)
            .field("incident_api_key", incident)
            .env(OPSGENIE_ALERT_API_KEY, alert)
            .env(OPSGENIE_INCIDENT_API_KEY, incident)
            .build())
    }

    fn secret_fields(&self) -> &'static [&'static str] {
        &["alert_api_key", "incident_api_key"]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }
}
