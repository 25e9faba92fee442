//! `tfdrift scan` command.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::adapters::live::terraform::TerraformInstaller;
use crate::cli::ScanArgs;
use crate::config::ScanConfig;
use crate::context::ServiceContext;
use crate::discovery::find_projects;
use crate::drift::{DriftPipeline, Orchestrator, ResultAggregate};
use crate::logging::LogContext;
use crate::ports::tool::ToolInstaller;
use crate::report;

/// Exit status when `--fail-on-drift` is set and drift was found.
pub const DRIFT_EXIT_CODE: u8 = 2;

/// Execute the `scan` command.
///
/// Loads `.env`, resolves the layered configuration, then scans with the
/// live adapters.
///
/// # Errors
///
/// Returns an error string for configuration problems, an unreadable search
/// root, an unobtainable terraform binary or a failed report write.
pub fn run(args: &ScanArgs) -> Result<ExitCode, String> {
    // A missing .env file is the normal case.
    let _ = dotenvy::dotenv();
    let cwd = std::env::current_dir().map_err(|e| format!("cannot determine working directory: {e}"))?;
    let config = load_config(args, &cwd, |key| std::env::var(key).ok())?;

    let log = LogContext::new(config.log_level, config.json_logs);
    tracing::dispatcher::with_default(log.dispatch(), || execute(&config, &log, ServiceContext::live()))
}

/// Resolves defaults, config file, environment and flags into one validated
/// configuration.
///
/// # Errors
///
/// Returns an error string if any layer is malformed or the result is invalid.
pub fn load_config<F>(args: &ScanArgs, cwd: &Path, lookup: F) -> Result<ScanConfig, String>
where
    F: Fn(&str) -> Option<String>,
{
    let config = ScanConfig::load(args.config.as_deref(), cwd)
        .and_then(|config| config.with_env(lookup))
        .map_err(|e| e.to_string())?;
    let config = args.apply(config);
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Runs a scan on a fresh multi-threaded runtime and emits the reports.
///
/// # Errors
///
/// See [`run`].
pub fn execute(config: &ScanConfig, log: &LogContext, ctx: ServiceContext) -> Result<ExitCode, String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;
    let aggregate = runtime.block_on(scan(config, log, &ctx))?;
    emit_reports(config, &ctx, &aggregate)?;

    if config.fail_on_drift && aggregate.has_drift() {
        return Ok(ExitCode::from(DRIFT_EXIT_CODE));
    }
    Ok(ExitCode::SUCCESS)
}

async fn scan(config: &ScanConfig, log: &LogContext, ctx: &ServiceContext) -> Result<ResultAggregate, String> {
    let started = Instant::now();
    let root = std::path::absolute(&config.path)
        .map_err(|e| format!("invalid path {}: {e}", config.path.display()))?;
    let projects: Vec<PathBuf> = find_projects(ctx.fs.as_ref(), &root)?;

    if projects.is_empty() {
        info!(path = %root.display(), "No *.tf files found");
        let now = ctx.clock.now();
        return Ok(ResultAggregate::new(ctx.id_gen.generate_id(), now, now, Vec::new()));
    }
    info!(path = %root.display(), projects = projects.len(), "discovered projects");

    let installer = TerraformInstaller::new(Arc::clone(&ctx.runner), Arc::clone(&ctx.fs))
        .with_executable(config.terraform_path.clone())
        .with_install_dir(config.install_dir.clone());
    let tools = installer.install(&config.terraform_version).await.map_err(|e| {
        error!(error = %e, "terraform is unavailable");
        e.to_string()
    })?;

    let pipeline = DriftPipeline::new(Arc::clone(&ctx.fs), tools, config.tool_timeout())
        .with_backend_config(config.backend_config.clone());
    let orchestrator = Orchestrator::new(ctx.clone(), pipeline, config.batch_policy(), log);
    let aggregate = orchestrator.scan(projects).await.map_err(|e| e.to_string())?;

    info!("Drift report took {:.2?}", started.elapsed());
    Ok(aggregate)
}

fn emit_reports(config: &ScanConfig, ctx: &ServiceContext, aggregate: &ResultAggregate) -> Result<(), String> {
    if config.json {
        let json = report::json::render(aggregate).map_err(|e| format!("failed to serialize results: {e}"))?;
        println!("{json}");
    } else {
        print!("{}", report::table::render(aggregate));
    }

    if config.html {
        ctx.fs
            .write(&config.html_file, &report::html::render(aggregate))
            .map_err(|e| format!("failed to write {}: {e}", config.html_file.display()))?;
        info!(file = %config.html_file.display(), "wrote HTML report");
    }
    Ok(())
}
