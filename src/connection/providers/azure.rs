//! Azure service principal connection

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

pub const AZURE_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const AZURE_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const AZURE_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const AZURE_ENVIRONMENT: &str = "AZURE_ENVIRONMENT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AzureFields {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub tenant_id: Option<String>,
    /// Cloud name, e.g. `AZUREPUBLICCLOUD`
    pub environment: Option<String>,
}

impl AzureFields {
    fn all_unset(&self) -> bool {
        self.client_id.is_none()
            && self.client_secret.is_none()
            && self.tenant_id.is_none()
            && self.environment.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct AzureConnection {
    identity: ConnectionIdentity,
    fields: AzureFields,
}

impl AzureConnection {
    pub fn new(identity: ConnectionIdentity, fields: AzureFields) -> Self {
        Self { identity, fields }
    }

    pub fn fields(&self) -> &AzureFields {
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
impl Connection for AzureConnection {
    fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    fn connection_type(&self) -> ConnectionType {
        ConnectionType::Azure
    }

    async fn resolve(&self, ctx: &ResolveContext) -> Result<Box<dyn Connection>> {
        if !self.fields.all_unset() {
            return Ok(self.clone_box());
        }

        tracing::debug!(connection = %self.identity, "Resolving Azure credentials from environment");
        Ok(Box::new(Self {
            identity: self.identity.clone(),
            fields: AzureFields {
                client_id: Some(ctx.var(AZURE_CLIENT_ID)),
                client_secret: Some(secret_string(ctx.var(AZURE_CLIENT_SECRET))),
                tenant_id: Some(ctx.var(AZURE_TENANT_ID)),
                environment: Some(ctx.var(AZURE_ENVIRONMENT)),
            },
        }))
    }

    fn equals(&self, other: Option<&dyn Connection>) -> bool {
        same_variant::<Self>(other).is_some_and(|other| {
            self.fields.client_id == other.fields.client_id
                && secret_eq(&self.fields.client_secret, &other.fields.client_secret)
                && self.fields.tenant_id == other.fields.tenant_id
                && self.fields.environment == other.fields.environment
        })
    }

    fn ttl(&self) -> i64 {
        NO_EXPIRY
    }

    fn value(&self) -> Result<Value> {
        let client_id = self.fields.client_id.as_deref();
        let client_secret = expose(&self.fields.client_secret);
        let tenant_id = self.fields.tenant_id.as_deref();
        let environment = self.fields.environment.as_deref();
        Ok(ValueBuilder::new(&self.identity, ConnectionType::Azure)
            .field("client_id", client_id)
            .field("client_secret", client_secret)
            .field("tenant_id", tenant_id)
            .field("environment", environment)
            .env(AZURE_CLIENT_ID, client_id)
            .env(AZURE_CLIENT_SECRET, client_secret)
            .env(AZURE_TENANT_ID, tenant_id)
            .env(AZURE_ENVIRONMENT, environment)
            .build())
    }

    fn secret_fields(&self) -> &'static [&'static str] {
        &["client_secret"]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectionName;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn identity() -> ConnectionIdentity {
        ConnectionIdentity::new("azure", ConnectionName::new("sp").unwrap(), None)
    }

    #[tokio::test]
    async fn test_resolves_service_principal_from_env() {
        let vars: HashMap<String, String> = [
            (AZURE_CLIENT_ID, "client"),
            (AZURE_CLIENT_SECRET, "hunter2"),
            (AZURE_TENANT_ID, "tenant"),
            (AZURE_ENVIRONMENT, "AZUREPUBLICCLOUD"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let ctx = ResolveContext::new().with_vars(Arc::new(vars));

        let resolved = AzureConnection::new(identity(), AzureFields::default())
            .resolve(&ctx)
            .await
            .unwrap();
        let value = resolved.value().unwrap();
        assert_eq!(value.get("client_id").and_then(Value::as_str), Some("client"));
        assert_eq!(value.get("client_secret").and_then(Value::as_str), Some("hunter2"));
        assert_eq!(value.get("tenant_id").and_then(Value::as_str), Some("tenant"));
        assert_eq!(
            value.get("environment").and_then(Value::as_str),
            Some("AZUREPUBLICCLOUD")
        );
        assert_eq!(value.get("name").and_then(Value::as_str), Some("azure.sp"));
    }

    #[test]
    fn test_debug_redacts_client_secret() {
        let connection = AzureConnection::new(
            identity(),
            AzureFields {
                client_secret: Some(secret_string("hunter2".to_string())),
                ..AzureFields::default()
            },
        );
        assert!(!format!("{connection:?}").contains("hunter2"));
    }
}
