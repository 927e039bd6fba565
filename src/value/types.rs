//! Type model for dynamic values, including capsule types
//!
//! A capsule type embeds an opaque native type inside the dynamic type
//! system. Two capsule types are the same type when their names match; the
//! wrapped native handle is never compared.

use crate::domain::{Result, TetherError};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Coarse resource kind carried in the `resource_type` key of capsule values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Connection,
    Notifier,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Connection => "connection",
            ResourceKind::Notifier => "notifier",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque native type wrapped by a capsule
///
/// The validator only asks a native type for its capabilities; it never
/// inspects the type itself.
pub trait NativeType: Send + Sync + fmt::Debug {
    /// Name of the native type, for messages
    fn type_name(&self) -> &str;

    /// Provider discriminator if the type is a specific connection variant
    fn connection_capability(&self) -> Option<&str> {
        None
    }

    /// Set when the type is one of the generic base types
    fn base_kind(&self) -> Option<ResourceKind> {
        None
    }
}

/// Native handle for the generic connection and notifier base types
#[derive(Debug)]
pub struct BaseNative(pub ResourceKind);

impl NativeType for BaseNative {
    fn type_name(&self) -> &str {
        self.0.as_str()
    }

    fn base_kind(&self) -> Option<ResourceKind> {
        Some(self.0)
    }
}

/// A capsule type: discriminator name plus opaque native handle
#[derive(Clone)]
pub struct CapsuleType {
    name: String,
    native: Arc<dyn NativeType>,
}

impl CapsuleType {
    pub fn new(name: impl Into<String>, native: Arc<dyn NativeType>) -> Self {
        Self {
            name: name.into(),
            native,
        }
    }

    /// The generic `connection` capsule
    pub fn generic_connection() -> Self {
        Self::new(
            ResourceKind::Connection.as_str(),
            Arc::new(BaseNative(ResourceKind::Connection)),
        )
    }

    /// The generic `notifier` capsule
    pub fn notifier() -> Self {
        Self::new(
            ResourceKind::Notifier.as_str(),
            Arc::new(BaseNative(ResourceKind::Notifier)),
        )
    }

    /// Discriminator string of this capsule type
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native(&self) -> &dyn NativeType {
        self.native.as_ref()
    }
}

impl PartialEq for CapsuleType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CapsuleType {}

impl Hash for CapsuleType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for CapsuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capsule({})", self.name)
    }
}

/// Declared or runtime type of a dynamic value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// The "any" type; every value conforms
    Dynamic,
    String,
    Number,
    Bool,
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>),
    Tuple(Vec<Type>),
    Object(BTreeMap<String, Type>),
    Capsule(CapsuleType),
}

impl Type {
    pub fn list(element: Type) -> Self {
        Type::List(Box::new(element))
    }

    pub fn map(element: Type) -> Self {
        Type::Map(Box::new(element))
    }

    /// Element type of a list or set
    pub fn collection_element(&self) -> Option<&Type> {
        match self {
            Type::List(element) | Type::Set(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_capsule(&self) -> Option<&CapsuleType> {
        match self {
            Type::Capsule(capsule) => Some(capsule),
            _ => None,
        }
    }

    /// Returns true if any part of this type is a capsule
    pub fn contains_capsule(&self) -> bool {
        match self {
            Type::Capsule(_) => true,
            Type::List(t) | Type::Set(t) | Type::Map(t) => t.contains_capsule(),
            Type::Tuple(types) => types.iter().any(Type::contains_capsule),
            Type::Object(fields) => fields.values().any(Type::contains_capsule),
            Type::Dynamic | Type::String | Type::Number | Type::Bool => false,
        }
    }

    /// Parses a type expression such as `list(connection.aws)`
    ///
    /// Supported forms: `any`, `string`, `number`, `bool`, `connection`,
    /// `connection.<type>`, `notifier`, `list(T)`, `set(T)` and `map(T)`.
    /// Specific connection capsules are looked up through `capsules`.
    pub fn parse(expr: &str, capsules: &dyn CapsuleLookup) -> Result<Type> {
        let expr = expr.trim();
        if let Some(open) = expr.find('(') {
            if !expr.ends_with(')') {
                return Err(TetherError::Validation(format!(
                    "Invalid type expression '{expr}': unbalanced parentheses"
                )));
            }
            let inner = Type::parse(&expr[open + 1..expr.len() - 1], capsules)?;
            return match expr[..open].trim() {
                "list" => Ok(Type::List(Box::new(inner))),
                "set" => Ok(Type::Set(Box::new(inner))),
                "map" => Ok(Type::Map(Box::new(inner))),
                other => Err(TetherError::Validation(format!(
                    "Unsupported type constructor '{other}' in '{expr}'"
                ))),
            };
        }

        match expr {
            "any" => Ok(Type::Dynamic),
            "string" => Ok(Type::String),
            "number" => Ok(Type::Number),
            "bool" => Ok(Type::Bool),
            "connection" => Ok(Type::Capsule(CapsuleType::generic_connection())),
            "notifier" => Ok(Type::Capsule(CapsuleType::notifier())),
            other => {
                let discriminator = other.strip_prefix("connection.").ok_or_else(|| {
                    TetherError::Validation(format!("Unknown type '{other}'"))
                })?;
                capsules
                    .connection_capsule(discriminator)
                    .map(Type::Capsule)
                    .ok_or_else(|| TetherError::UnknownConnectionType(discriminator.to_string()))
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Dynamic => f.write_str("any"),
            Type::String => f.write_str("string"),
            Type::Number => f.write_str("number"),
            Type::Bool => f.write_str("bool"),
            Type::List(t) => write!(f, "list({t})"),
            Type::Set(t) => write!(f, "set({t})"),
            Type::Map(t) => write!(f, "map({t})"),
            Type::Tuple(types) => {
                let parts: Vec<String> = types.iter().map(ToString::to_string).collect();
                write!(f, "tuple([{}])", parts.join(", "))
            }
            Type::Object(fields) => {
                let parts: Vec<String> = fields.iter().map(|(k, t)| format!("{k}={t}")).collect();
                write!(f, "object({{{}}})", parts.join(", "))
            }
            Type::Capsule(capsule) => f.write_str(capsule.name()),
        }
    }
}

/// Source of specific connection capsule types, keyed by discriminator
pub trait CapsuleLookup {
    fn connection_capsule(&self, discriminator: &str) -> Option<CapsuleType>;
}

/// Returns true if `ty` is a capsule type
pub fn is_capsule_type(ty: &Type) -> bool {
    matches!(ty, Type::Capsule(_))
}

/// Returns true if `ty` is a list or set whose element is a capsule
pub fn is_list_of_capsule(ty: &Type) -> bool {
    ty.collection_element().is_some_and(is_capsule_type)
}

/// Discriminator of a capsule or list-of-capsule type
///
/// # Errors
///
/// Returns a validation error for any other type.
pub fn encapsulated_discriminator(ty: &Type) -> Result<&str> {
    match ty {
        Type::Capsule(capsule) => Ok(capsule.name()),
        other => match other.collection_element() {
            Some(Type::Capsule(capsule)) => Ok(capsule.name()),
            _ => Err(TetherError::Validation(format!(
                "type {other} is not a capsule or a list of capsules"
            ))),
        },
    }
}
