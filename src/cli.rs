//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ScanConfig;
use crate::logging::LogLevel;

/// Top-level CLI parser for `tfdrift`.
#[derive(Debug, Parser)]
#[command(name = "tfdrift", version, about = "Detect drift across many Terraform projects")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan every project under a directory and report drift.
    Scan(ScanArgs),
    /// List the project directories a scan would visit.
    Projects {
        /// Root directory to search.
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },
}

/// Flags for `tfdrift scan`.
///
/// Every value flag is optional so that unset flags leave file and
/// environment settings alone.
#[derive(Debug, Default, Args)]
pub struct ScanArgs {
    /// Root directory to search for projects.
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Write an HTML report.
    #[arg(long)]
    pub html: bool,

    /// Destination of the HTML report.
    #[arg(long, value_name = "FILE")]
    pub html_file: Option<PathBuf>,

    /// Print all results as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Backend configuration file passed to `terraform init`.
    #[arg(long, value_name = "FILE")]
    pub backend_config: Option<String>,

    /// Terraform version to scan with.
    #[arg(long, value_name = "VERSION")]
    pub terraform_version: Option<String>,

    /// Terraform executable to use.
    #[arg(long, value_name = "BIN")]
    pub terraform_path: Option<PathBuf>,

    /// Directory holding `<version>/terraform` installs.
    #[arg(long, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Projects launched per batch.
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Seconds between batch launches.
    #[arg(long, value_name = "SECS")]
    pub batch_delay_secs: Option<u64>,

    /// Maximum pipelines running at once.
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Seconds each terraform call may run.
    #[arg(long, value_name = "SECS")]
    pub tool_timeout_secs: Option<u64>,

    /// YAML config file (defaults to ./tfdrift.yaml when present).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Exit with status 2 when any project drifted.
    #[arg(long)]
    pub fail_on_drift: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl ScanArgs {
    /// Overlays the flags that were given onto `config`.
    #[must_use]
    pub fn apply(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(path) = &self.path {
            config.path.clone_from(path);
        }
        if let Some(file) = &self.html_file {
            config.html_file.clone_from(file);
        }
        if self.backend_config.is_some() {
            config.backend_config.clone_from(&self.backend_config);
        }
        if let Some(version) = &self.terraform_version {
            config.terraform_version.clone_from(version);
        }
        if self.terraform_path.is_some() {
            config.terraform_path.clone_from(&self.terraform_path);
        }
        if self.install_dir.is_some() {
            config.install_dir.clone_from(&self.install_dir);
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(delay) = self.batch_delay_secs {
            config.batch_delay_secs = delay;
        }
        if self.max_concurrency.is_some() {
            config.max_concurrency = self.max_concurrency;
        }
        if let Some(timeout) = self.tool_timeout_secs {
            config.tool_timeout_secs = timeout;
        }
        config.html |= self.html;
        config.json |= self.json;
        config.fail_on_drift |= self.fail_on_drift;
        config.json_logs |= self.json_logs;
        if self.verbose {
            config.log_level = LogLevel::Debug;
        }
        config
    }
}
