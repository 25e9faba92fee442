//! Error types for drift scanning.
//!
//! Only [`ConfigureError`] ever escapes a scan. Everything a single project can
//! hit is folded into its [`DriftResult`](crate::drift::DriftResult) instead.

use std::path::PathBuf;
use std::time::Duration;

/// Fatal errors raised while binding the planning tool.
///
/// A scan cannot continue with any project once one of these occurs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigureError {
    /// No executable for the requested version could be found.
    #[error("terraform {version} is not installed (searched: {searched})")]
    ToolNotFound {
        /// The requested tool version.
        version: String,
        /// Locations that were checked, comma separated.
        searched: String,
    },

    /// The executable exists but reports a different version.
    #[error("terraform at {path} reports version {found}, expected {expected}")]
    VersionMismatch {
        /// Path of the executable that was checked.
        path: PathBuf,
        /// The requested version.
        expected: String,
        /// The version the executable reported.
        found: String,
    },

    /// Asking the executable for its version failed.
    #[error("failed to query terraform version at {path}: {source}")]
    VersionQuery {
        /// Path of the executable that was checked.
        path: PathBuf,
        /// The underlying invocation failure.
        #[source]
        source: ToolError,
    },

    /// The tool could not be bound to a project directory.
    #[error("cannot bind terraform to {path}: {reason}")]
    InvalidWorkdir {
        /// The project directory.
        path: PathBuf,
        /// Why binding failed.
        reason: String,
    },
}

/// Errors from a single external tool invocation.
///
/// These are always project-local.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The process could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// The program that failed to start.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The process was killed by a signal before it could exit.
    #[error("{program} was terminated ({status})")]
    Terminated {
        /// The program that was terminated.
        program: String,
        /// The platform description of how it ended.
        status: String,
    },

    /// The call exceeded its time budget and was abandoned.
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// The scan was cancelled while the call was in flight.
    #[error("cancelled")]
    Cancelled,

    /// The process ran but exited unsuccessfully.
    #[error("exited with status {code}: {stderr}")]
    Failed {
        /// The process exit code.
        code: i32,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The process succeeded but its output could not be understood.
    #[error("unexpected output: {0}")]
    Output(String),
}

/// Errors from parsing a plan summary line into change counts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CountParseError {
    /// Fewer than three integers were present.
    #[error("expected 3 counts in {line:?}, found {found}")]
    MissingCounts {
        /// The line that was parsed.
        line: String,
        /// How many integers were found.
        found: usize,
    },

    /// An integer token was negative or out of range.
    #[error("count {token:?} is not a valid number")]
    InvalidNumber {
        /// The offending token.
        token: String,
    },
}

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// The config file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`ScanConfig`](crate::config::ScanConfig).
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// The config file path.
        path: PathBuf,
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// An environment variable held a value of the wrong shape.
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv {
        /// The variable name.
        key: String,
        /// The rejected value.
        value: String,
    },

    /// The log level is not one of the known names.
    #[error("unknown log level {0:?} (expected debug, info, warning or error)")]
    UnknownLogLevel(String),

    /// `batch_size` was zero.
    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    /// `max_concurrency` was set to zero.
    #[error("max_concurrency must be at least 1 when set")]
    ZeroConcurrency,

    /// `tool_timeout_secs` was zero.
    #[error("tool_timeout_secs must be greater than zero")]
    ZeroTimeout,
}
