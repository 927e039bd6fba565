//! Connection imports
//!
//! An import pulls connections defined elsewhere into the workspace,
//! optionally filtered by glob patterns and renamed with a prefix.

use crate::domain::SourceRange;
use regex::Regex;
use std::collections::BTreeSet;

/// A declared import of external connections
///
/// Equality ignores the declaration range and the order of `connections`.
#[derive(Debug, Clone, Default)]
pub struct ConnectionImport {
    pub source: Option<String>,
    /// Patterns over unqualified names; `*` matches any run of characters
    pub connections: Vec<String>,
    pub prefix: Option<String>,
    pub range: Option<SourceRange>,
}

impl ConnectionImport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    pub fn with_connections(mut self, connections: Vec<String>) -> Self {
        self.connections = connections;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_range(mut self, range: Option<SourceRange>) -> Self {
        self.range = range;
        self
    }

    /// Returns true if `unqualified_name` is selected by this import
    ///
    /// An import with no patterns selects everything.
    pub fn matches(&self, unqualified_name: &str) -> bool {
        self.connections.is_empty()
            || self
                .connections
                .iter()
                .any(|pattern| glob_matches(pattern, unqualified_name))
    }

    /// Short name a selected connection is known by once imported
    ///
    /// The prefix applies to the short name only, so `aws.prod` imported with
    /// prefix `sp_` becomes `aws.sp_prod`.
    pub fn imported_name(&self, short_name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{short_name}"),
            None => short_name.to_string(),
        }
    }
}

impl PartialEq for ConnectionImport {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.connections.iter().collect::<BTreeSet<_>>()
                == other.connections.iter().collect::<BTreeSet<_>>()
            && self.prefix == other.prefix
    }
}

impl Eq for ConnectionImport {}

fn glob_matches(pattern: &str, name: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == name;
    }
    let expr = format!("^{}$", regex::escape(pattern).replace(r"\*", ".*"));
    Regex::new(&expr).is_ok_and(|re| re.is_match(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_order_and_range() {
        let a = ConnectionImport::new("~/.steampipe/config/*.spc")
            .with_connections(vec!["aws.a".to_string(), "aws.b".to_string()])
            .with_prefix("sp_");
        let b = ConnectionImport::new("~/.steampipe/config/*.spc")
            .with_connections(vec!["aws.b".to_string(), "aws.a".to_string()])
            .with_prefix("sp_")
            .with_range(Some(SourceRange::lines("tether.toml", 4, 8)));
        assert_eq!(a, b);
    }

    #[test]
    fn test_inequality() {
        let base = ConnectionImport::new("a").with_connections(vec!["x".to_string()]);
        assert_ne!(base, ConnectionImport::new("b").with_connections(vec!["x".to_string()]));
        assert_ne!(base, ConnectionImport::new("a").with_connections(vec!["y".to_string()]));
        assert_ne!(base, base.clone().with_prefix("p_"));
    }

    #[test]
    fn test_matches() {
        let all = ConnectionImport::new("src");
        assert!(all.matches("aws.prod"));

        let filtered = ConnectionImport::new("src")
            .with_connections(vec!["aws.*".to_string(), "slack.team".to_string()]);
        assert!(filtered.matches("aws.prod"));
        assert!(filtered.matches("slack.team"));
        assert!(!filtered.matches("slack.other"));
        assert!(!filtered.matches("gcp.aws.x"));
    }

    #[test]
    fn test_imported_name() {
        let import = ConnectionImport::new("src").with_prefix("sp_");
        assert_eq!(import.imported_name("prod"), "sp_prod");
        assert_eq!(ConnectionImport::new("src").imported_name("prod"), "prod");
    }
}
