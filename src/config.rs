//! Scan configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `TFDRIFT_*` environment variables, then command-line flags. The result is
//! validated once and passed by value to whatever needs it.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::drift::orchestrator::{BatchPolicy, DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE};
use crate::error::ConfigError;
use crate::logging::LogLevel;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "tfdrift.yaml";

/// Terraform version requested when none is configured.
pub const DEFAULT_TERRAFORM_VERSION: &str = "1.7.0";

/// Per-call tool timeout when none is configured.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30 * 60;

const ENV_PREFIX: &str = "TFDRIFT_";

/// Everything a scan needs to know before it starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Root directory searched for projects.
    pub path: PathBuf,
    /// Backend configuration file passed to every `init`.
    pub backend_config: Option<String>,
    /// Terraform version every project is scanned with.
    pub terraform_version: String,
    /// Explicit terraform executable, checked before any other location.
    pub terraform_path: Option<PathBuf>,
    /// Directory holding per-version installs as `<dir>/<version>/terraform`.
    pub install_dir: Option<PathBuf>,
    /// Projects launched per batch.
    pub batch_size: usize,
    /// Seconds between batch launches.
    pub batch_delay_secs: u64,
    /// Optional cap on pipelines running at once.
    pub max_concurrency: Option<usize>,
    /// Seconds each tool call may run before it is abandoned.
    pub tool_timeout_secs: u64,
    /// Write an HTML report.
    pub html: bool,
    /// Destination of the HTML report.
    pub html_file: PathBuf,
    /// Print the full aggregate as JSON on stdout.
    pub json: bool,
    /// Exit with status 2 when any project drifted.
    pub fail_on_drift: bool,
    /// Minimum log severity.
    pub log_level: LogLevel,
    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            backend_config: None,
            terraform_version: DEFAULT_TERRAFORM_VERSION.to_string(),
            terraform_path: None,
            install_dir: None,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_secs: DEFAULT_BATCH_DELAY.as_secs(),
            max_concurrency: None,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            html: false,
            html_file: PathBuf::from("index.html"),
            json: false,
            fail_on_drift: false,
            log_level: LogLevel::Info,
            json_logs: false,
        }
    }
}

impl ScanConfig {
    /// Loads the explicit config file, or [`DEFAULT_CONFIG_FILE`] from `cwd`
    /// if it exists, or the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a chosen file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let implicit = cwd.join(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            return Self::from_file(&implicit);
        }
        Ok(Self::default())
    }

    /// Reads a YAML config file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_yaml(&text, path)
    }

    fn from_yaml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: origin.to_path_buf(), source })
    }

    /// Applies `TFDRIFT_*` variables resolved through `lookup`.
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for a value of the wrong shape.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).filter(|value| !value.trim().is_empty()).map(|value| (key, value))
        };

        if let Some((_, value)) = var("PATH") {
            self.path = PathBuf::from(value);
        }
        if let Some((_, value)) = var("BACKEND_CONFIG") {
            self.backend_config = Some(value);
        }
        if let Some((_, value)) = var("TERRAFORM_VERSION") {
            self.terraform_version = value;
        }
        if let Some((_, value)) = var("TERRAFORM_PATH") {
            self.terraform_path = Some(PathBuf::from(value));
        }
        if let Some((_, value)) = var("INSTALL_DIR") {
            self.install_dir = Some(PathBuf::from(value));
        }
        if let Some((key, value)) = var("BATCH_SIZE") {
            self.batch_size = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = var("BATCH_DELAY_SECS") {
            self.batch_delay_secs = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = var("MAX_CONCURRENCY") {
            self.max_concurrency = Some(parse_value(&key, &value)?);
        }
        if let Some((key, value)) = var("TOOL_TIMEOUT_SECS") {
            self.tool_timeout_secs = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = var("HTML") {
            self.html = parse_flag(&key, &value)?;
        }
        if let Some((_, value)) = var("HTML_FILE") {
            self.html_file = PathBuf::from(value);
        }
        if let Some((key, value)) = var("JSON") {
            self.json = parse_flag(&key, &value)?;
        }
        if let Some((key, value)) = var("FAIL_ON_DRIFT") {
            self.fail_on_drift = parse_flag(&key, &value)?;
        }
        if let Some((_, value)) = var("LOG_LEVEL") {
            self.log_level = value.parse()?;
        }
        if let Some((key, value)) = var("JSON_LOGS") {
            self.json_logs = parse_flag(&key, &value)?;
        }
        Ok(self)
    }

    /// Rejects values no scan can run with.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.tool_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Pause between batch launches.
    #[must_use]
    pub const fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_secs)
    }

    /// Time budget for each tool call.
    #[must_use]
    pub const fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// The batching policy these settings describe.
    #[must_use]
    pub const fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            batch_size: self.batch_size,
            batch_delay: self.batch_delay(),
            max_concurrency: self.max_concurrency,
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key: key.to_string(), value: value.to_string() })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv { key: key.to_string(), value: value.to_string() }),
    }
}
