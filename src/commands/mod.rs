//! Command dispatch and handlers.

pub mod projects;
pub mod scan;

use std::process::ExitCode;

use crate::cli::Command;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<ExitCode, String> {
    match command {
        Command::Scan(args) => scan::run(args),
        Command::Projects { path } => projects::run(path),
    }
}
