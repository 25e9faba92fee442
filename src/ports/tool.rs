//! Planning tool port: the operations a drift pipeline performs per project.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{ConfigureError, ToolError};

/// Boxed future returned by every [`PlanningTool`] operation.
pub type ToolFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ToolError>> + Send + 'a>>;

/// Boxed future returned by [`ToolInstaller::install`].
pub type InstallFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Arc<dyn ToolProvider>, ConfigureError>> + Send + 'a>>;

/// What a state read reveals about a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Version of the tool that last wrote the state; empty when unknown.
    pub terraform_version: String,
    /// Addresses of the resources recorded in the state.
    pub resources: Vec<String>,
}

/// A planning tool bound to one project directory.
///
/// Futures returned here must be safe to drop mid-flight. The pipeline wraps
/// every call in a timeout and a cancellation check and simply drops the
/// future when either fires.
pub trait PlanningTool: Send + Sync {
    /// Initializes the working directory, optionally with a backend config file.
    fn init<'a>(&'a self, backend_config: Option<&'a str>) -> ToolFuture<'a, ()>;

    /// Reads the current state.
    fn show_state(&self) -> ToolFuture<'_, StateSnapshot>;

    /// Runs a dry-run plan writing the plan file `out` into the working directory.
    ///
    /// Resolves to the detailed exit code: `0` for no changes, `2` for pending
    /// changes. Any other code is passed through unchanged; a plain error exit
    /// is reported as [`ToolError::Failed`].
    fn plan<'a>(&'a self, out: &'a str) -> ToolFuture<'a, i32>;

    /// Renders a saved plan file as human-readable text.
    fn show_plan_raw<'a>(&'a self, plan_file: &'a Path) -> ToolFuture<'a, String>;
}

/// A resolved tool executable that can be bound to project directories.
pub trait ToolProvider: Send + Sync {
    /// The version this provider was resolved for.
    fn version(&self) -> &str;

    /// Binds the tool to a project directory.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigureError`] when the directory cannot host the tool.
    /// This is fatal for the whole scan.
    fn bind(&self, workdir: &Path) -> Result<Box<dyn PlanningTool>, ConfigureError>;
}

/// Obtains a [`ToolProvider`] for a requested version.
pub trait ToolInstaller: Send + Sync {
    /// Resolves an executable for exactly `version`.
    ///
    /// Resolution is attempted once; nothing is retried.
    fn install<'a>(&'a self, version: &'a str) -> InstallFuture<'a>;
}
