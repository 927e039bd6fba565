//! Parsed declaration blocks
//!
//! The configuration language parser is an external collaborator; this
//! module only defines the shape it hands over. A connection declaration
//!
//! ```text
//! connection "slack" "team" {
//!   token = "xoxb-..."
//! }
//! ```
//!
//! arrives as a [`Block`] with type `connection`, labels `["slack", "team"]`
//! and one attribute.

use crate::domain::{Result, SourceRange, TetherError};
use crate::value::Value;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Block type of connection declarations
pub const CONNECTION_BLOCK: &str = "connection";

/// A single `name = value` attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Value,
    pub range: Option<SourceRange>,
}

/// A labelled declaration block
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub block_type: String,
    pub labels: Vec<String>,
    pub attributes: BTreeMap<String, Attribute>,
    pub range: Option<SourceRange>,
}

impl Block {
    pub fn new(block_type: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            block_type: block_type.into(),
            labels,
            attributes: BTreeMap::new(),
            range: None,
        }
    }

    /// A `connection "<type>" "<name>"` block with no attributes
    pub fn connection(connection_type: &str, name: &str) -> Self {
        Self::new(
            CONNECTION_BLOCK,
            vec![connection_type.to_string(), name.to_string()],
        )
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(
            name.to_string(),
            Attribute {
                name: name.to_string(),
                value: value.into(),
                range: None,
            },
        );
        self
    }

    pub fn with_range(mut self, range: Option<SourceRange>) -> Self {
        self.range = range;
        self
    }

    /// Attribute values keyed by name
    pub fn attribute_values(&self) -> BTreeMap<String, Value> {
        self.attributes
            .iter()
            .map(|(name, attr)| (name.clone(), attr.value.clone()))
            .collect()
    }
}

/// Decodes attribute values into a provider's field struct
///
/// Null attributes count as unset.
///
/// # Errors
///
/// Returns a configuration error for unknown attributes or values of the
/// wrong shape.
pub(crate) fn decode_fields<T: DeserializeOwned>(attrs: &BTreeMap<String, Value>) -> Result<T> {
    let mut object = serde_json::Map::new();
    for (name, value) in attrs {
        if value.is_null() {
            continue;
        }
        object.insert(name.clone(), value.to_json()?);
    }
    serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| TetherError::Configuration(format!("Invalid connection attributes: {e}")))
}
