//! `tfdrift projects` command.

use std::path::Path;
use std::process::ExitCode;

use crate::context::ServiceContext;
use crate::discovery::find_projects;

/// Execute the `projects` command.
///
/// Prints every discovered project directory, one per line.
///
/// # Errors
///
/// Returns an error string if `path` cannot be searched.
pub fn run(path: &Path) -> Result<ExitCode, String> {
    let ctx = ServiceContext::live();
    let projects = list(&ctx, path)?;
    if projects.is_empty() {
        println!("No *.tf files found in {}", path.display());
    }
    for project in &projects {
        println!("{project}");
    }
    Ok(ExitCode::SUCCESS)
}

/// Discovered project directories as display strings.
///
/// # Errors
///
/// Returns an error string if `path` cannot be searched.
pub fn list(ctx: &ServiceContext, path: &Path) -> Result<Vec<String>, String> {
    let projects = find_projects(ctx.fs.as_ref(), path)?;
    Ok(projects.iter().map(|p| p.display().to_string()).collect())
}
