//! Connections and the resolution protocol.
//!
//! A connection is a typed, named set of credentials for one external
//! provider. Declared fields are optional; an unset field means "resolve
//! from the environment". Every provider variant implements [`Connection`]:
//!
//! - [`Connection::resolve`] returns a new, environment-backed instance and
//!   never mutates the receiver
//! - [`Connection::equals`] compares provider-specific fields only
//! - [`Connection::ttl`] tells callers how long a resolved instance may be reused
//! - [`Connection::value`] projects the instance into the dynamic value system
//!
//! Variants are created through the [`ConnectionRegistry`], which maps the
//! discriminator string of a declaration to a factory.
//!
//! # Example
//!
//! ```rust,no_run
//! use tether::connection::{ConnectionRegistry, ResolveContext};
//! use tether::domain::ConnectionName;
//!
//! # async fn example() -> tether::domain::Result<()> {
//! let registry = ConnectionRegistry::new();
//! let declared = registry.instantiate("slack", ConnectionName::new("team").unwrap(), None)?;
//!
//! let resolved = declared.resolve(&ResolveContext::new()).await?;
//! assert_eq!(resolved.ttl(), -1);
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod context;
pub mod import;
pub mod providers;
pub mod registry;

pub use block::{Attribute, Block};
pub use context::{ProcessEnv, ResolveContext, VarSource};
pub use import::ConnectionImport;
pub use registry::{ConnectionRegistry, TypeDescriptor};

use crate::config::SecretString;
use crate::domain::{ConnectionIdentity, Result, TetherError};
use crate::value::{NativeType, ResourceKind, Value, RESOURCE_TYPE_KEY, TYPE_KEY};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default TTL, in seconds, for providers whose credentials are short-lived
pub const DEFAULT_TTL_SECONDS: i64 = 300;

/// TTL meaning "never expires"
pub const NO_EXPIRY: i64 = -1;

/// Provider discriminator
///
/// The set is closed; each variant maps to exactly one registry entry and
/// one [`Connection`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConnectionType {
    Abuseipdb,
    Aws,
    Azure,
    Gcp,
    Github,
    Gitlab,
    Jira,
    Okta,
    Opsgenie,
    Pagerduty,
    Slack,
    Teams,
    Virustotal,
}

impl ConnectionType {
    /// Every provider, in discriminator order
    pub const ALL: [ConnectionType; 13] = [
        ConnectionType::Abuseipdb,
        ConnectionType::Aws,
        ConnectionType::Azure,
        ConnectionType::Gcp,
        ConnectionType::Github,
        ConnectionType::Gitlab,
        ConnectionType::Jira,
        ConnectionType::Okta,
        ConnectionType::Opsgenie,
        ConnectionType::Pagerduty,
        ConnectionType::Slack,
        ConnectionType::Teams,
        ConnectionType::Virustotal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Abuseipdb => "abuseipdb",
            ConnectionType::Aws => "aws",
            ConnectionType::Azure => "azure",
            ConnectionType::Gcp => "gcp",
            ConnectionType::Github => "github",
            ConnectionType::Gitlab => "gitlab",
            ConnectionType::Jira => "jira",
            ConnectionType::Okta => "okta",
            ConnectionType::Opsgenie => "opsgenie",
            ConnectionType::Pagerduty => "pagerduty",
            ConnectionType::Slack => "slack",
            ConnectionType::Teams => "teams",
            ConnectionType::Virustotal => "virustotal",
        }
    }

    /// Name of this provider's capsule type, e.g. `connection.aws`
    pub fn capsule_name(&self) -> String {
        format!("{}.{}", ResourceKind::Connection, self.as_str())
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self> {
        ConnectionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TetherError::UnknownConnectionType(s.to_string()))
    }
}

/// Native handle wrapped by a provider's capsule type
#[derive(Debug, Clone, Copy)]
pub struct ConnectionNative(pub ConnectionType);

impl NativeType for ConnectionNative {
    fn type_name(&self) -> &str {
        self.0.as_str()
    }

    fn connection_capability(&self) -> Option<&str> {
        Some(self.0.as_str())
    }

    fn base_kind(&self) -> Option<ResourceKind> {
        Some(ResourceKind::Connection)
    }
}

/// Contract every connection variant implements
///
/// Implementations are immutable values: `resolve` allocates a new instance
/// and is safe to call concurrently on distinct receivers.
#[async_trait]
pub trait Connection: Send + Sync + fmt::Debug {
    /// Identity bound when the declaring block was instantiated
    fn identity(&self) -> &ConnectionIdentity;

    /// Provider discriminator; fixed at construction
    fn connection_type(&self) -> ConnectionType;

    /// Produces a fully populated instance
    ///
    /// Returns a copy of the receiver when every required field is already
    /// set; otherwise a new instance with unset fields filled from the
    /// environment or credential files.
    ///
    /// # Errors
    ///
    /// Returns a resolution error when a credential source exists but cannot
    /// be read, parsed or exchanged for a token. No partial instance is
    /// produced on failure.
    async fn resolve(&self, ctx: &ResolveContext) -> Result<Box<dyn Connection>>;

    /// Compares provider-specific fields with `other`
    ///
    /// `None` and connections of another variant are never equal.
    fn equals(&self, other: Option<&dyn Connection>) -> bool;

    /// Seconds a resolved instance may be reused; [`NO_EXPIRY`] for never
    fn ttl(&self) -> i64;

    /// Projects the connection into a dynamic value with an `env` sub-map
    fn value(&self) -> Result<Value>;

    /// Names of fields in [`Connection::value`] that hold secrets
    fn secret_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn as_any(&self) -> &dyn Any;

    fn clone_box(&self) -> Box<dyn Connection>;
}

impl Clone for Box<dyn Connection> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Nil-safe comparison: two `None`s are equal, `None` and `Some` are not
pub fn connections_equal(a: Option<&dyn Connection>, b: Option<&dyn Connection>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), b @ Some(_)) => a.equals(b),
        _ => false,
    }
}

/// Downcasts `other` to the receiver's concrete variant
pub(crate) fn same_variant<'a, T: Any>(other: Option<&'a dyn Connection>) -> Option<&'a T> {
    other.and_then(|o| o.as_any().downcast_ref::<T>())
}

/// Compares optional secrets by their exposed value
pub(crate) fn secret_eq(a: &Option<SecretString>, b: &Option<SecretString>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.expose_secret().as_str() == b.expose_secret().as_str(),
        _ => false,
    }
}

pub(crate) fn expose(secret: &Option<SecretString>) -> Option<&str> {
    secret.as_ref().map(|s| s.expose_secret().as_str())
}

/// Builds the value projection shared by all variants
pub(crate) struct ValueBuilder {
    fields: BTreeMap<String, Value>,
    env: BTreeMap<String, Value>,
}

impl ValueBuilder {
    pub(crate) fn new(identity: &ConnectionIdentity, connection_type: ConnectionType) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(
            RESOURCE_TYPE_KEY.to_string(),
            Value::from(ResourceKind::Connection.as_str()),
        );
        fields.insert(TYPE_KEY.to_string(), Value::from(connection_type.as_str()));
        fields.insert(
            "short_name".to_string(),
            Value::from(identity.short_name.as_str()),
        );
        fields.insert(
            "name".to_string(),
            Value::from(identity.unqualified_name.as_str()),
        );
        fields.insert(
            "full_name".to_string(),
            Value::from(identity.full_name.as_str()),
        );
        Self {
            fields,
            env: BTreeMap::new(),
        }
    }

    /// Adds a field; unset fields project as null
    pub(crate) fn field(mut self, name: &str, value: Option<&str>) -> Self {
        self.fields
            .insert(name.to_string(), value.map(Value::from).unwrap_or(Value::Null));
        self
    }

    pub(crate) fn number(mut self, name: &str, value: Option<i64>) -> Self {
        self.fields
            .insert(name.to_string(), value.map(Value::from).unwrap_or(Value::Null));
        self
    }

    /// Records the environment variable a set value corresponds to
    pub(crate) fn env(mut self, var: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.env.insert(var.to_string(), Value::from(value));
        }
        self
    }

    pub(crate) fn build(mut self) -> Value {
        self.fields.insert("env".to_string(), Value::Map(self.env));
        Value::Map(self.fields)
    }
}
