//! Connection type registry
//!
//! Maps discriminator strings (`"aws"`, `"slack"`, ...) to a factory and the
//! provider's capsule type. The registry is built once at start-up and read
//! concurrently afterwards; the only mutation is recording which types have
//! been materialised by [`ConnectionRegistry::default_connections`].

use crate::connection::block::CONNECTION_BLOCK;
use crate::connection::{providers, Block, Connection, ConnectionNative, ConnectionType};
use crate::domain::{
    ConnectionIdentity, ConnectionName, Diagnostic, Diagnostics, Result, SourceRange, TetherError,
};
use crate::value::{CapsuleLookup, CapsuleType, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Builds a connection from its identity and declared attributes
pub type Factory =
    fn(ConnectionIdentity, &BTreeMap<String, Value>) -> Result<Box<dyn Connection>>;

/// What the registry knows about one provider
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub connection_type: ConnectionType,
    pub capsule_type: CapsuleType,
}

impl TypeDescriptor {
    pub fn new(connection_type: ConnectionType) -> Self {
        Self {
            connection_type,
            capsule_type: CapsuleType::new(
                connection_type.capsule_name(),
                Arc::new(ConnectionNative(connection_type)),
            ),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    descriptor: TypeDescriptor,
    factory: Factory,
}

/// Discriminator to factory table
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    entries: BTreeMap<&'static str, Entry>,
    known_types: BTreeSet<String>,
}

impl ConnectionRegistry {
    /// Registry with every built-in provider
    pub fn new() -> Self {
        let entries = ConnectionType::ALL
            .into_iter()
            .map(|t| {
                (
                    t.as_str(),
                    Entry {
                        descriptor: TypeDescriptor::new(t),
                        factory: providers::factory(t),
                    },
                )
            })
            .collect();
        Self {
            entries,
            known_types: BTreeSet::new(),
        }
    }

    /// Registry with no providers
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
            known_types: BTreeSet::new(),
        }
    }

    /// Adds a provider
    ///
    /// # Errors
    ///
    /// Returns an internal error if the discriminator is already registered.
    pub fn register(&mut self, connection_type: ConnectionType, factory: Factory) -> Result<()> {
        let key = connection_type.as_str();
        if self.entries.contains_key(key) {
            return Err(TetherError::Internal(format!(
                "Connection type '{key}' is already registered"
            )));
        }
        self.entries.insert(
            key,
            Entry {
                descriptor: TypeDescriptor::new(connection_type),
                factory,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, discriminator: &str) -> Option<&TypeDescriptor> {
        self.entries.get(discriminator).map(|e| &e.descriptor)
    }

    /// Registered discriminators in sorted order
    pub fn discriminators(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Creates an undeclared connection of `discriminator` named `name`
    ///
    /// # Errors
    ///
    /// Returns [`TetherError::UnknownConnectionType`] for an unregistered
    /// discriminator, or an internal error if the factory produces a
    /// connection of the wrong type.
    pub fn instantiate(
        &self,
        discriminator: &str,
        name: ConnectionName,
        decl_range: Option<SourceRange>,
    ) -> Result<Box<dyn Connection>> {
        self.build(discriminator, name, decl_range, &BTreeMap::new())
    }

    fn build(
        &self,
        discriminator: &str,
        name: ConnectionName,
        decl_range: Option<SourceRange>,
        attrs: &BTreeMap<String, Value>,
    ) -> Result<Box<dyn Connection>> {
        let entry = self
            .entries
            .get(discriminator)
            .ok_or_else(|| TetherError::UnknownConnectionType(discriminator.to_string()))?;

        let identity = ConnectionIdentity::new(discriminator, name, decl_range);
        let connection = (entry.factory)(identity, attrs)?;

        if connection.connection_type() != entry.descriptor.connection_type {
            return Err(TetherError::Internal(format!(
                "Factory for '{discriminator}' produced a '{}' connection",
                connection.connection_type()
            )));
        }
        Ok(connection)
    }

    /// Instantiates the connection a `connection "<type>" "<name>"` block declares
    ///
    /// # Errors
    ///
    /// Returns diagnostics anchored at the block for a malformed block, an
    /// invalid name, an unknown type or attributes the provider rejects.
    pub fn from_block(&self, block: &Block) -> std::result::Result<Box<dyn Connection>, Diagnostics> {
        let fail = |summary: String, detail: String| {
            Diagnostics::from(
                Diagnostic::error(summary)
                    .with_detail(detail)
                    .with_subject(block.range.clone()),
            )
        };

        if block.block_type != CONNECTION_BLOCK {
            return Err(fail(
                "Unexpected block type".to_string(),
                format!("expected '{CONNECTION_BLOCK}', found '{}'", block.block_type),
            ));
        }
        let [connection_type, name] = block.labels.as_slice() else {
            return Err(fail(
                "Invalid connection block".to_string(),
                format!(
                    "a connection block requires a type and a name label, found {}",
                    block.labels.len()
                ),
            ));
        };
        let name = ConnectionName::new(name.as_str())
            .map_err(|e| fail("Invalid connection name".to_string(), e))?;

        self.build(connection_type, name, block.range.clone(), &block.attribute_values())
            .map_err(|e| match e {
                TetherError::UnknownConnectionType(t) => fail(
                    "Unknown connection type".to_string(),
                    format!("'{t}' is not a registered connection type"),
                ),
                other => fail(
                    format!("Invalid {connection_type} connection"),
                    other.to_string(),
                ),
            })
    }

    /// One `default` connection per registered type, keyed by discriminator
    ///
    /// Each type instantiated here is recorded as a known connection type.
    ///
    /// # Errors
    ///
    /// Returns the first instantiation error; no map is produced in that case.
    pub fn default_connections(&mut self) -> Result<BTreeMap<String, Box<dyn Connection>>> {
        let discriminators: Vec<&'static str> = self.discriminators().collect();
        let mut defaults = BTreeMap::new();

        for discriminator in discriminators {
            let connection =
                self.instantiate(discriminator, ConnectionName::default_name(), None)?;
            self.known_types.insert(discriminator.to_string());
            defaults.insert(discriminator.to_string(), connection);
        }

        tracing::debug!(count = defaults.len(), "Instantiated default connections");
        Ok(defaults)
    }

    /// Types recorded by [`ConnectionRegistry::default_connections`]
    pub fn known_connection_types(&self) -> impl Iterator<Item = &str> + '_ {
        self.known_types.iter().map(String::as_str)
    }

    pub fn is_known_connection_type(&self, discriminator: &str) -> bool {
        self.known_types.contains(discriminator)
    }

    pub fn capsule_type(&self, discriminator: &str) -> Option<&CapsuleType> {
        self.lookup(discriminator).map(|d| &d.capsule_type)
    }

    /// Capsule accepting any connection
    pub fn generic_connection_type(&self) -> CapsuleType {
        CapsuleType::generic_connection()
    }

    pub fn notifier_type(&self) -> CapsuleType {
        CapsuleType::notifier()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapsuleLookup for ConnectionRegistry {
    fn connection_capsule(&self, discriminator: &str) -> Option<CapsuleType> {
        self.capsule_type(discriminator).cloned()
    }
}
