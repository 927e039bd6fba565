//! Dynamic value model
//!
//! Configuration values cross from declarations into the runtime as
//! [`Value`] trees. Values that stand in for an opaque native object (a
//! connection, a notifier) are either [`Value::Capsule`] references or maps
//! carrying the `resource_type` / `type` discriminator keys.
//!
//! ```rust
//! use tether::value::{Value, Type};
//!
//! let value = Value::from_json(serde_json::json!({
//!     "resource_type": "connection",
//!     "type": "slack",
//! }));
//! assert_eq!(value.get("type").and_then(Value::as_str), Some("slack"));
//! assert!(matches!(value.type_of(), Type::Object(_)));
//! ```

pub mod types;

pub use types::{
    encapsulated_discriminator, is_capsule_type, is_list_of_capsule, BaseNative, CapsuleLookup,
    CapsuleType, NativeType, ResourceKind, Type,
};

use crate::domain::{Result, TetherError};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Key holding the coarse resource kind of a capsule value
pub const RESOURCE_TYPE_KEY: &str = "resource_type";

/// Key holding the provider discriminator of a capsule value
pub const TYPE_KEY: &str = "type";

/// Reference to an opaque native object inside the value system
#[derive(Clone)]
pub struct CapsuleValue {
    ty: CapsuleType,
    handle: Arc<dyn Any + Send + Sync>,
}

impl CapsuleValue {
    pub fn new(ty: CapsuleType, handle: Arc<dyn Any + Send + Sync>) -> Self {
        Self { ty, handle }
    }

    pub fn capsule_type(&self) -> &CapsuleType {
        &self.ty
    }

    /// Downcasts the wrapped object
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref::<T>()
    }
}

impl fmt::Debug for CapsuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapsuleValue({})", self.ty.name())
    }
}

impl PartialEq for CapsuleValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && Arc::ptr_eq(&self.handle, &other.handle)
    }
}

/// A dynamic configuration value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Capsule(CapsuleValue),
}

impl Value {
    /// Runtime type of this value
    ///
    /// Lists report a tuple of their element types and maps an object of
    /// their field types, so a literal never structurally equals a declared
    /// `list(...)` or `map(...)` type.
    pub fn type_of(&self) -> Type {
        match self {
            Value::Null => Type::Dynamic,
            Value::Bool(_) => Type::Bool,
            Value::Number(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::List(items) => Type::Tuple(items.iter().map(Value::type_of).collect()),
            Value::Map(fields) => Type::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.type_of()))
                    .collect(),
            ),
            Value::Capsule(capsule) => Type::Capsule(capsule.capsule_type().clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Looks up a key on a map value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|fields| fields.get(key))
    }

    /// Builds a value from JSON
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Builds a value from a TOML value; datetimes become strings
    pub fn from_toml(toml: toml::Value) -> Self {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i as f64),
            toml::Value::Float(f) => Value::Number(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_toml).collect())
            }
            toml::Value::Table(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_toml(v)))
                    .collect(),
            ),
        }
    }

    /// Converts to JSON
    ///
    /// # Errors
    ///
    /// Capsule references have no JSON form and produce a serialization error.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Map(fields) => {
                let mut object = serde_json::Map::new();
                for (k, v) in fields {
                    object.insert(k.clone(), v.to_json()?);
                }
                serde_json::Value::Object(object)
            }
            Value::Capsule(capsule) => {
                return Err(TetherError::Serialization(format!(
                    "capsule value of type {} cannot be converted to JSON",
                    capsule.capsule_type().name()
                )))
            }
        })
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Value::Map(fields)
    }
}
