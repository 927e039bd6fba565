//! Loaded workspace
//!
//! A [`Workspace`] turns a [`TetherConfig`] into live connections: declared
//! `[[connection]]` tables are instantiated through the registry, `[[import]]`
//! sources pull in selected connections from other tether files, every
//! provider without a declared `default` gets a synthesized one, and
//! `[[param]]` defaults are checked against their declared types.
//! Problems found while loading are collected as [`Diagnostics`] rather
//! than aborting the load.
//!
//! # Example
//!
//! ```rust,no_run
//! use tether::workspace::Workspace;
//!
//! # async fn example() -> tether::domain::Result<()> {
//! let workspace = Workspace::load("tether.toml")?;
//! if workspace.diagnostics().has_errors() {
//!     eprintln!("{}", workspace.diagnostics());
//! }
//!
//! let ctx = workspace.resolve_context();
//! let slack = workspace.resolve("slack.team", &ctx).await?;
//! println!("{}", slack.value()?.to_json()?);
//! # Ok(())
//! # }
//! ```

use crate::config::schema::{ConfigSource, CONNECTION_NAME_KEY, CONNECTION_TYPE_KEY};
use crate::config::{load_config, TetherConfig};
use crate::connection::block::{Attribute, Block};
use crate::connection::{Connection, ConnectionImport, ConnectionRegistry, ResolveContext};
use crate::domain::{Diagnostic, Diagnostics, Result, SourceRange, TetherError};
use crate::validate::{validate_default, ValidationSubject};
use crate::value::{Type, Value};
use crate::{log_error_with_context, log_resolve_complete, log_resolve_start};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A declared, typed parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub declared: Type,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub range: Option<SourceRange>,
}

/// Connections, imports and params of one configuration
#[derive(Debug)]
pub struct Workspace {
    registry: ConnectionRegistry,
    /// Keyed by unqualified name, e.g. `slack.team`
    connections: BTreeMap<String, Box<dyn Connection>>,
    imports: Vec<ConnectionImport>,
    params: Vec<Param>,
    diagnostics: Diagnostics,
    resolve_timeout: Duration,
}

impl Workspace {
    /// Loads and builds the workspace described by the file at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded. Problems with
    /// individual declarations are reported through [`Workspace::diagnostics`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = load_config(path)?;
        Self::from_config(&config, ConnectionRegistry::new())
    }

    /// Builds a workspace from parsed configuration
    ///
    /// # Errors
    ///
    /// Returns an error only if synthesizing provider defaults fails, which
    /// indicates a broken registry.
    pub fn from_config(config: &TetherConfig, mut registry: ConnectionRegistry) -> Result<Self> {
        let source = config.source.as_ref();
        let mut diagnostics = Diagnostics::new();
        let mut connections: BTreeMap<String, Box<dyn Connection>> = BTreeMap::new();

        for table in &config.connections {
            let range = span_range(source, table.span());
            let connection = connection_block(table.get_ref(), range.clone())
                .and_then(|block| registry.from_block(&block));
            match connection {
                Ok(connection) => insert_unique(&mut connections, connection, range, &mut diagnostics),
                Err(diags) => diagnostics.extend(diags),
            }
        }

        let imports: Vec<ConnectionImport> = config
            .imports
            .iter()
            .map(|import| {
                let decl = import.get_ref();
                ConnectionImport {
                    source: decl.source.clone(),
                    connections: decl.connections.clone(),
                    prefix: decl.prefix.clone(),
                    range: span_range(source, import.span()),
                }
            })
            .collect();

        let base_dir = source.and_then(|s| Path::new(&s.filename).parent().map(Path::to_path_buf));
        for import in &imports {
            for connection in imported_connections(import, base_dir.as_deref(), &registry, &mut diagnostics) {
                let range = import.range.clone();
                insert_unique(&mut connections, connection, range, &mut diagnostics);
            }
        }

        for connection in registry.default_connections()?.into_values() {
            connections
                .entry(connection.identity().unqualified_name.clone())
                .or_insert(connection);
        }

        let mut params = Vec::with_capacity(config.params.len());
        for spanned in &config.params {
            let decl = spanned.get_ref();
            let range = span_range(source, spanned.span());
            let declared = match Type::parse(&decl.type_expr, &registry) {
                Ok(ty) => ty,
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid type for param '{}'", decl.name))
                            .with_detail(e.to_string())
                            .with_subject(range),
                    );
                    continue;
                }
            };

            let default = decl.default.clone().map(Value::from_toml);
            // only capsule-bearing types have anything to check
            if let Some(value) = default.as_ref().filter(|_| declared.contains_capsule()) {
                diagnostics.extend(validate_default(
                    &ValidationSubject::new(declared.clone(), value.clone())
                        .with_range(range.clone()),
                ));
            }

            params.push(Param {
                name: decl.name.clone(),
                declared,
                default,
                description: decl.description.clone(),
                range,
            });
        }

        tracing::info!(
            connections = connections.len(),
            imports = config.imports.len(),
            params = params.len(),
            diagnostics = diagnostics.len(),
            "Workspace loaded"
        );

        Ok(Self {
            registry,
            connections,
            imports,
            params,
            diagnostics,
            resolve_timeout: Duration::from_secs(config.application.resolve_timeout_seconds),
        })
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn imports(&self) -> &[ConnectionImport] {
        &self.imports
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Looks up a connection by unqualified (`slack.team`) or full
    /// (`connection.slack.team`) name
    pub fn connection(&self, name: &str) -> Option<&dyn Connection> {
        let name = name.strip_prefix("connection.").unwrap_or(name);
        self.connections.get(name).map(Box::as_ref)
    }

    /// All connections in name order
    pub fn connections(&self) -> impl Iterator<Item = &dyn Connection> + '_ {
        self.connections.values().map(Box::as_ref)
    }

    /// Resolution context over the process environment, bounded by the
    /// configured timeout
    pub fn resolve_context(&self) -> ResolveContext {
        ResolveContext::new().with_timeout(self.resolve_timeout)
    }

    /// Resolves one connection
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown name, or the
    /// connection's resolution error.
    pub async fn resolve(&self, name: &str, ctx: &ResolveContext) -> Result<Box<dyn Connection>> {
        let connection = self.connection(name).ok_or_else(|| {
            TetherError::Configuration(format!("Connection '{name}' is not defined"))
        })?;
        resolve_logged(connection, ctx).await
    }

    /// Resolves every connection concurrently
    ///
    /// Results are keyed by unqualified name; one failure does not affect
    /// the others.
    pub async fn resolve_all(
        &self,
        ctx: &ResolveContext,
    ) -> BTreeMap<String, Result<Box<dyn Connection>>> {
        let pending = self.connections.iter().map(|(name, connection)| async move {
            (name.clone(), resolve_logged(connection.as_ref(), ctx).await)
        });
        futures::future::join_all(pending).await.into_iter().collect()
    }
}

async fn resolve_logged(
    connection: &dyn Connection,
    ctx: &ResolveContext,
) -> Result<Box<dyn Connection>> {
    let identity = connection.identity();
    log_resolve_start!(identity, connection.connection_type());
    let started = Instant::now();

    match connection.resolve(ctx).await {
        Ok(resolved) => {
            log_resolve_complete!(identity, resolved.ttl(), started.elapsed());
            Ok(resolved)
        }
        Err(e) => {
            log_error_with_context!(e, identity.full_name.as_str());
            Err(e)
        }
    }
}

fn insert_unique(
    connections: &mut BTreeMap<String, Box<dyn Connection>>,
    connection: Box<dyn Connection>,
    range: Option<SourceRange>,
    diagnostics: &mut Diagnostics,
) {
    let name = connection.identity().unqualified_name.clone();
    if connections.contains_key(&name) {
        diagnostics.push(
            Diagnostic::error("Duplicate connection")
                .with_detail(format!("connection '{name}' is declared more than once"))
                .with_subject(range),
        );
    } else {
        connections.insert(name, connection);
    }
}

/// Connections declared in an import's source file that its patterns select,
/// renamed with its prefix
///
/// Only tether configurations (`.toml`) are read; other sources are skipped.
/// The source's own imports are not followed.
fn imported_connections(
    import: &ConnectionImport,
    base_dir: Option<&Path>,
    registry: &ConnectionRegistry,
    diagnostics: &mut Diagnostics,
) -> Vec<Box<dyn Connection>> {
    let Some(path) = import
        .source
        .as_deref()
        .and_then(|source| import_path(source, base_dir))
    else {
        tracing::debug!(source = ?import.source, "Import source is not a tether configuration, skipping");
        return Vec::new();
    };

    let config = match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            diagnostics.push(
                Diagnostic::error("Failed to load import source")
                    .with_detail(e.to_string())
                    .with_subject(import.range.clone()),
            );
            return Vec::new();
        }
    };

    let source = config.source.as_ref();
    let mut imported = Vec::new();
    for table in &config.connections {
        let mut block = match connection_block(table.get_ref(), span_range(source, table.span())) {
            Ok(block) => block,
            Err(diags) => {
                diagnostics.extend(diags);
                continue;
            }
        };
        if !import.matches(&block.labels.join(".")) {
            continue;
        }
        if let Some(name) = block.labels.get_mut(1) {
            *name = import.imported_name(name);
        }
        match registry.from_block(&block) {
            Ok(connection) => imported.push(connection),
            Err(diags) => diagnostics.extend(diags),
        }
    }

    tracing::debug!(
        source = %path.display(),
        imported = imported.len(),
        "Import applied"
    );
    imported
}

/// Filesystem path of a `.toml` import source; `~/` expands to the home
/// directory and relative paths resolve against the importing file
fn import_path(source: &str, base_dir: Option<&Path>) -> Option<PathBuf> {
    let path = match source.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()?.join(rest),
        None => PathBuf::from(source),
    };
    if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
        return None;
    }
    Some(match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    })
}

fn span_range(source: Option<&ConfigSource>, span: Range<usize>) -> Option<SourceRange> {
    source.map(|s| {
        let end = span.end.saturating_sub(1).max(span.start);
        SourceRange::lines(s.filename.clone(), s.line_of(span.start), s.line_of(end))
    })
}

/// Turns a `[[connection]]` table into a labelled block
fn connection_block(
    table: &toml::Table,
    range: Option<SourceRange>,
) -> std::result::Result<Block, Diagnostics> {
    let label = |key: &str| match table.get(key) {
        Some(toml::Value::String(s)) => Ok(s.clone()),
        _ => Err(Diagnostics::from(
            Diagnostic::error("Invalid connection declaration")
                .with_detail(format!("'{key}' must be a string"))
                .with_subject(range.clone()),
        )),
    };
    let connection_type = label(CONNECTION_TYPE_KEY)?;
    let name = label(CONNECTION_NAME_KEY)?;

    let mut block = Block::connection(&connection_type, &name).with_range(range.clone());
    for (key, value) in table {
        if key == CONNECTION_TYPE_KEY || key == CONNECTION_NAME_KEY {
            continue;
        }
        block.attributes.insert(
            key.clone(),
            Attribute {
                name: key.clone(),
                value: Value::from_toml(value.clone()),
                range: range.clone(),
            },
        );
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn workspace(toml: &str) -> Workspace {
        let config = parse_config(toml).unwrap();
        Workspace::from_config(&config, ConnectionRegistry::new()).unwrap()
    }

    #[test]
    fn test_defaults_are_seeded() {
        let ws = workspace("");
        assert!(ws.diagnostics().is_empty());
        assert_eq!(ws.connections().count(), 13);
        assert!(ws.connection("aws.default").is_some());
        assert!(ws.connection("connection.gcp.default").is_some());
        assert!(ws.registry().is_known_connection_type("okta"));
    }

    #[test]
    fn test_declared_default_wins() {
        let ws = workspace(
            r#"
[[connection]]
type = "slack"
name = "default"
token = "declared"
"#,
        );
        let slack = ws.connection("slack.default").unwrap();
        assert_eq!(
            slack.value().unwrap().get("token").and_then(Value::as_str),
            Some("declared")
        );
        assert_eq!(ws.connections().count(), 13);
    }

    #[test]
    fn test_bad_declarations_become_diagnostics() {
        let ws = workspace(
            r#"
[[connection]]
type = "mastodon"
name = "social"

[[connection]]
type = "slack"
name = "team"
password = "nope"

[[connection]]
type = "github"
name = "ci"

[[connection]]
type = "github"
name = "ci"
"#,
        );
        assert_eq!(ws.diagnostics().len(), 3);
        assert!(ws.connection("github.ci").is_some());
        assert!(ws.connection("slack.team").is_none());
    }

    #[test]
    fn test_param_defaults_are_validated() {
        let ws = workspace(
            r#"
[[param]]
name = "notify"
type = "list(connection.slack)"
default = [{ resource_type = "connection", type = "slack" }, { type = "github" }]

[[param]]
name = "region"
type = "string"
default = "eu-west-1"
"#,
        );
        assert_eq!(ws.params().len(), 2);
        assert_eq!(ws.diagnostics().len(), 1);
    }

    #[test]
    fn test_invalid_param_type() {
        let ws = workspace("[[param]]\nname = \"x\"\ntype = \"connection.mastodon\"\n");
        assert!(ws.params().is_empty());
        assert!(ws.diagnostics().has_errors());
    }

    #[test]
    fn test_imports_are_collected() {
        let ws = workspace(
            r#"
[[import]]
source = "~/.steampipe/config/aws.spc"
connections = ["aws.*"]
prefix = "sp_"
"#,
        );
        assert_eq!(ws.imports().len(), 1);
        assert!(ws.imports()[0].matches("aws.prod"));
    }

    fn write(dir: &Path, file: &str, contents: &str) -> PathBuf {
        let path = dir.join(file);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_imports_bring_in_selected_connections() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "shared.toml",
            r#"
[[connection]]
type = "aws"
name = "prod"
access_key = "AKIASHARED"

[[connection]]
type = "aws"
name = "dev"

[[connection]]
type = "slack"
name = "team"
"#,
        );
        let main = write(
            dir.path(),
            "tether.toml",
            r#"
[[import]]
source = "shared.toml"
connections = ["aws.*"]
prefix = "sp_"
"#,
        );

        let ws = Workspace::load(&main).unwrap();
        assert!(ws.diagnostics().is_empty(), "{}", ws.diagnostics());
        let prod = ws.connection("aws.sp_prod").unwrap();
        assert_eq!(
            prod.value().unwrap().get("access_key").and_then(Value::as_str),
            Some("AKIASHARED")
        );
        assert!(ws.connection("aws.sp_dev").is_some());
        assert!(ws.connection("aws.prod").is_none());
        assert!(ws.connection("slack.sp_team").is_none());
        assert_eq!(ws.connections().count(), 15);
    }

    #[test]
    fn test_imported_name_clashing_with_declaration() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "shared.toml", "[[connection]]\ntype = \"github\"\nname = \"ci\"\n");
        let main = write(
            dir.path(),
            "tether.toml",
            "[[connection]]\ntype = \"github\"\nname = \"ci\"\n\n[[import]]\nsource = \"shared.toml\"\n",
        );

        let ws = Workspace::load(&main).unwrap();
        assert_eq!(ws.diagnostics().len(), 1);
        assert!(ws.diagnostics().to_string().contains("github.ci"));
    }

    #[test]
    fn test_missing_import_source_is_a_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(
            dir.path(),
            "tether.toml",
            "[[import]]\nsource = \"absent.toml\"\n",
        );

        let ws = Workspace::load(&main).unwrap();
        assert!(ws.diagnostics().has_errors());
        assert_eq!(ws.connections().count(), 13);
    }

    #[test]
    fn test_non_tether_import_source_is_skipped() {
        let ws = workspace("[[import]]\nsource = \"~/.steampipe/config/aws.spc\"\n");
        assert!(ws.diagnostics().is_empty());
        assert_eq!(ws.connections().count(), 13);
    }

    #[tokio::test]
    async fn test_resolve_unknown_name() {
        let ws = workspace("");
        let err = ws
            .resolve("slack.nope", &ResolveContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TetherError::Configuration(_)));
    }
}
