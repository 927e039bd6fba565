//! Resolution context
//!
//! Everything a `resolve` call reads from its surroundings comes through a
//! [`ResolveContext`]: environment variables, the user's home directory, the
//! HTTP client used for token exchange, and the caller's cancellation signal
//! and deadline.

use crate::domain::ResolveError;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Source of environment variables
pub trait VarSource: Send + Sync + fmt::Debug {
    /// Returns the variable's value, or `None` if it is unset
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl VarSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Ambient inputs for connection resolution
///
/// Cloning is cheap; clones share the variable source and HTTP client.
///
/// # Example
///
/// ```rust
/// use tether::connection::ResolveContext;
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let mut vars = HashMap::new();
/// vars.insert("SLACK_TOKEN".to_string(), "xoxb-123".to_string());
///
/// let ctx = ResolveContext::new()
///     .with_vars(Arc::new(vars))
///     .with_timeout(Duration::from_secs(30));
/// assert_eq!(ctx.var("SLACK_TOKEN"), "xoxb-123");
/// assert_eq!(ctx.var("UNSET_VARIABLE"), "");
/// ```
#[derive(Clone)]
pub struct ResolveContext {
    vars: Arc<dyn VarSource>,
    home_dir: Option<PathBuf>,
    http: reqwest::Client,
    shutdown: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl ResolveContext {
    /// Context over the process environment and the current user's home directory
    pub fn new() -> Self {
        Self {
            vars: Arc::new(ProcessEnv),
            home_dir: dirs::home_dir(),
            http: reqwest::Client::new(),
            shutdown: None,
            deadline: None,
        }
    }

    pub fn with_vars(mut self, vars: Arc<dyn VarSource>) -> Self {
        self.vars = vars;
        self
    }

    pub fn with_home_dir(mut self, home_dir: Option<PathBuf>) -> Self {
        self.home_dir = home_dir;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Attaches a shutdown signal; `true` cancels in-flight resolution
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Bounds resolution to `timeout` from now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Value of an environment variable; unset reads as the empty string
    pub fn var(&self, name: &str) -> String {
        self.vars.var(name).unwrap_or_default()
    }

    /// Value of an environment variable if set and non-empty
    pub fn non_empty_var(&self, name: &str) -> Option<String> {
        self.vars.var(name).filter(|v| !v.is_empty())
    }

    pub fn home_dir(&self) -> Option<&Path> {
        self.home_dir.as_deref()
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Returns true once the shutdown signal has fired
    pub fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Runs one blocking resolution step under the caller's cancellation
    /// signal and deadline
    ///
    /// # Errors
    ///
    /// Returns the step's own error, or [`ResolveError::Cancelled`] /
    /// [`ResolveError::DeadlineExceeded`] naming `step`.
    pub async fn run_step<T, F>(&self, step: &str, fut: F) -> Result<T, ResolveError>
    where
        F: Future<Output = Result<T, ResolveError>>,
    {
        if self.is_cancelled() {
            return Err(ResolveError::Cancelled(step.to_string()));
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(ResolveError::DeadlineExceeded(step.to_string()));
        }

        let deadline = self.deadline;
        tokio::select! {
            result = fut => result,
            _ = wait_for_shutdown(self.shutdown.clone()) => {
                tracing::warn!(step = step, "Resolution cancelled");
                Err(ResolveError::Cancelled(step.to_string()))
            }
            _ = wait_for_deadline(deadline) => {
                tracing::warn!(step = step, "Resolution deadline exceeded");
                Err(ResolveError::DeadlineExceeded(step.to_string()))
            }
        }
    }
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResolveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext")
            .field("vars", &self.vars)
            .field("home_dir", &self.home_dir)
            .field("cancellable", &self.shutdown.is_some())
            .field("deadline", &self.deadline)
            .finish()
    }
}

async fn wait_for_shutdown(shutdown: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = shutdown else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // sender dropped without signalling
            return std::future::pending().await;
        }
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Arc<dyn VarSource> {
        Arc::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn test_unset_var_reads_empty() {
        let ctx = ResolveContext::new().with_vars(vars(&[("SET", "1"), ("EMPTY", "")]));
        assert_eq!(ctx.var("SET"), "1");
        assert_eq!(ctx.var("MISSING"), "");
        assert_eq!(ctx.non_empty_var("EMPTY"), None);
        assert_eq!(ctx.non_empty_var("SET").as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_run_step_passes_result_through() {
        let ctx = ResolveContext::new();
        let result = ctx.run_step("noop", async { Ok::<_, ResolveError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_run_step_honours_shutdown() {
        let (tx, rx) = watch::channel(false);
        let ctx = ResolveContext::new().with_shutdown(rx);

        let step = ctx.run_step("slow read", async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, ResolveError>(())
        });
        let signal = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send(true).unwrap();
        };
        let (result, _) = tokio::join!(step, signal);
        assert!(matches!(result, Err(ResolveError::Cancelled(step)) if step == "slow read"));
    }

    #[tokio::test]
    async fn test_run_step_rejects_when_already_cancelled() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let ctx = ResolveContext::new().with_shutdown(rx);
        assert!(ctx.is_cancelled());
        let result = ctx.run_step("read", async { Ok::<_, ResolveError>(()) }).await;
        assert!(matches!(result, Err(ResolveError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_run_step_honours_deadline() {
        let ctx = ResolveContext::new().with_timeout(Duration::from_millis(10));
        let result = ctx
            .run_step("token exchange", async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, ResolveError>(())
            })
            .await;
        assert!(matches!(result, Err(ResolveError::DeadlineExceeded(_))));
    }
}
