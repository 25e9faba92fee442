//! Structured logging setup.
//!
//! The subscriber is built into an explicit [`LogContext`] and handed to the
//! components that log, instead of being installed process-wide. Scan workers
//! run on other runtime threads, so the orchestrator attaches the context to
//! each spawned task itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Dispatch;
use tracing_subscriber::{fmt as layer_fmt, layer::SubscriberExt, EnvFilter};

use crate::error::ConfigError;

/// Minimum severity of emitted log events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-step tool invocations and stage transitions.
    Debug,
    /// Batch launches and per-project outcomes.
    #[default]
    Info,
    /// Degraded results only.
    Warning,
    /// Fatal problems only.
    Error,
}

impl LogLevel {
    /// The level as an `EnvFilter` directive.
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError::UnknownLogLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directive())
    }
}

/// A constructed tracing subscriber, ready to be attached to work.
#[derive(Clone)]
pub struct LogContext {
    dispatch: Dispatch,
}

impl LogContext {
    /// Builds a subscriber writing to stderr.
    ///
    /// `RUST_LOG`, when set and valid, overrides `level`. JSON output uses
    /// one object per line.
    #[must_use]
    pub fn new(level: LogLevel, json: bool) -> Self {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.directive()));
        let registry = tracing_subscriber::registry().with(filter);

        let dispatch = if json {
            Dispatch::new(registry.with(layer_fmt::layer().json().with_writer(std::io::stderr)))
        } else {
            Dispatch::new(
                registry.with(layer_fmt::layer().with_target(false).with_writer(std::io::stderr)),
            )
        };
        Self { dispatch }
    }

    /// Builds a subscriber that routes output through the test harness.
    #[must_use]
    pub fn for_tests() -> Self {
        let registry = tracing_subscriber::registry().with(EnvFilter::new("debug"));
        Self {
            dispatch: Dispatch::new(
                registry.with(layer_fmt::layer().with_target(false).with_test_writer()),
            ),
        }
    }

    /// The dispatcher to attach to futures or scopes.
    #[must_use]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

impl fmt::Debug for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogContext").finish_non_exhaustive()
    }
}
