//! Core library entry for the `tfdrift` CLI.
//!
//! `tfdrift` runs `terraform plan` across many project directories in
//! staggered batches and reports which ones have drifted from their state.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod discovery;
pub mod drift;
pub mod error;
pub mod logging;
pub mod ports;
pub mod report;

use std::process::ExitCode;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// Help and version requests print to stdout and succeed.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<ExitCode, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            print!("{err}");
            return Ok(ExitCode::SUCCESS);
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli.command)
}
