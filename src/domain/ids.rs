//! Connection identifier types with validation
//!
//! Newtype wrappers for connection names and the identity a connection
//! carries once its declaring block has been bound.

use super::diagnostics::SourceRange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of a declared connection (the second block label)
///
/// Names start with a letter or underscore and contain only ASCII
/// alphanumerics, `_` and `-`.
///
/// # Examples
///
/// ```
/// use tether::domain::ids::ConnectionName;
/// use std::str::FromStr;
///
/// let name = ConnectionName::from_str("prod_account").unwrap();
/// assert_eq!(name.as_str(), "prod_account");
/// assert!(ConnectionName::new("9lives").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionName(String);

impl ConnectionName {
    /// Name given to synthesized provider-default connections
    pub const DEFAULT: &'static str = "default";

    /// Creates a new ConnectionName from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(ConnectionName)` if the name is valid, `Err` otherwise
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        let mut chars = name.chars();
        match chars.next() {
            None => return Err("Connection name cannot be empty".to_string()),
            Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
                return Err(format!(
                    "Invalid connection name '{name}': must start with a letter or underscore"
                ));
            }
            _ => {}
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(format!(
                "Invalid connection name '{name}': only letters, digits, '_' and '-' are allowed"
            ));
        }
        Ok(Self(name))
    }

    /// The `default` name
    pub fn default_name() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    /// Returns the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ConnectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity bound to a connection at instantiation
///
/// For a block `connection "slack" "team" { ... }`:
/// - `short_name` is `team`
/// - `unqualified_name` is `slack.team`
/// - `full_name` is `connection.slack.team`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionIdentity {
    pub short_name: ConnectionName,
    pub unqualified_name: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decl_range: Option<SourceRange>,
}

impl ConnectionIdentity {
    /// Builds the identity for a connection of `connection_type` named `name`
    pub fn new(connection_type: &str, name: ConnectionName, decl_range: Option<SourceRange>) -> Self {
        let unqualified_name = format!("{connection_type}.{name}");
        Self {
            full_name: format!("connection.{unqualified_name}"),
            unqualified_name,
            short_name: name,
            decl_range,
        }
    }
}

impl fmt::Display for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_name_valid() {
        assert!(ConnectionName::new("default").is_ok());
        assert!(ConnectionName::new("_private").is_ok());
        assert!(ConnectionName::new("prod-eu_1").is_ok());
    }

    #[test]
    fn test_connection_name_invalid() {
        assert!(ConnectionName::new("").is_err());
        assert!(ConnectionName::new("1abc").is_err());
        assert!(ConnectionName::new("has space").is_err());
        assert!(ConnectionName::new("dot.ted").is_err());
    }

    #[test]
    fn test_identity_names() {
        let identity = ConnectionIdentity::new("slack", ConnectionName::new("team").unwrap(), None);
        assert_eq!(identity.short_name.as_str(), "team");
        assert_eq!(identity.unqualified_name, "slack.team");
        assert_eq!(identity.full_name, "connection.slack.team");
        assert_eq!(identity.to_string(), "connection.slack.team");
    }
}
