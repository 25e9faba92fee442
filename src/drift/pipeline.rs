//! The per-project drift pipeline.
//!
//! Runs reset → configure → initialize → snapshot → plan → extract for one
//! project and folds every project-local failure into the returned
//! [`DriftResult`]. Only a failure to bind the tool escapes, as a
//! [`ConfigureError`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::counts::{extract_counts, find_summary_line, trim_plan};
use super::result::{project_name, ChangeCounts, DriftResult, DriftSummary};
use crate::error::{ConfigureError, ToolError};
use crate::ports::filesystem::FileSystem;
use crate::ports::tool::{ToolFuture, ToolProvider};

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Cache reset, nothing bound yet.
    Created,
    /// Binding the tool to the project.
    Configuring,
    /// Running `init`.
    Initializing,
    /// `init` succeeded.
    Initialized,
    /// Running `plan`.
    Planning,
    /// `plan` ran to an exit code.
    Planned,
    /// Reading the plan artifact.
    ExtractingCounts,
    /// A result was produced from a finished plan.
    Complete,
    /// A result was produced from a failed step.
    Failed,
}

impl PipelineStage {
    /// Returns `true` if `next` may directly follow `self`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Configuring)
                | (Self::Configuring, Self::Initializing)
                | (Self::Initializing, Self::Initialized | Self::Failed)
                | (Self::Initialized, Self::Planning)
                | (Self::Planning, Self::Planned | Self::Failed)
                | (Self::Planned, Self::ExtractingCounts)
                | (Self::ExtractingCounts, Self::Complete)
        )
    }

    /// Returns `true` once a result has been produced.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Configuring => "configuring",
            Self::Initializing => "initializing",
            Self::Initialized => "initialized",
            Self::Planning => "planning",
            Self::Planned => "planned",
            Self::ExtractingCounts => "extracting_counts",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct StageTracker {
    stage: PipelineStage,
}

impl StageTracker {
    const fn new() -> Self {
        Self { stage: PipelineStage::Created }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal pipeline transition {} -> {next}",
            self.stage
        );
        debug!(from = %self.stage, to = %next, "stage");
        self.stage = next;
    }
}

/// Reduces a plan outcome to the result summary.
///
/// The plan's own error always wins. The artifact error only explains a bare
/// error exit that carried no message of its own.
#[must_use]
pub fn classify_plan(plan: &Result<i32, ToolError>, artifact_error: Option<&ToolError>) -> DriftSummary {
    match plan {
        Ok(0) => DriftSummary::NoChange,
        Ok(2) => DriftSummary::DriftDetected,
        Ok(1) => DriftSummary::Failed(
            artifact_error.map_or_else(|| "plan".to_string(), |err| format!("plan: {err}")),
        ),
        Ok(code) => DriftSummary::UnknownExitCode(*code),
        Err(err) => DriftSummary::Failed(format!("plan: {err}")),
    }
}

/// Drift detection for one project at a time.
///
/// A pipeline is shared by every worker of a scan; each [`run`](Self::run)
/// only touches its own project directory.
pub struct DriftPipeline {
    fs: Arc<dyn FileSystem>,
    tools: Arc<dyn ToolProvider>,
    backend_config: Option<String>,
    tool_timeout: Duration,
    cancel: CancellationToken,
}

impl DriftPipeline {
    /// Creates a pipeline bounding every tool call by `tool_timeout`.
    pub fn new(fs: Arc<dyn FileSystem>, tools: Arc<dyn ToolProvider>, tool_timeout: Duration) -> Self {
        Self { fs, tools, backend_config: None, tool_timeout, cancel: CancellationToken::new() }
    }

    /// Passes a backend configuration file to every `init`.
    #[must_use]
    pub fn with_backend_config(mut self, backend_config: Option<String>) -> Self {
        self.backend_config = backend_config;
        self
    }

    /// Aborts in-flight tool calls when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The tool version this pipeline binds.
    #[must_use]
    pub fn tool_version(&self) -> &str {
        self.tools.version()
    }

    /// Scans one project.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigureError`] only if the tool cannot be bound to the
    /// project. Every other failure is reported inside the result.
    pub async fn run(&self, project: &Path) -> Result<DriftResult, ConfigureError> {
        let name = project_name(project);
        let span = info_span!("pipeline", project = %name);
        self.run_stages(project, name).instrument(span).await
    }

    async fn run_stages(&self, project: &Path, name: String) -> Result<DriftResult, ConfigureError> {
        let mut stage = StageTracker::new();
        self.reset(project);

        stage.advance(PipelineStage::Configuring);
        let tool = self.tools.bind(project)?;

        stage.advance(PipelineStage::Initializing);
        if let Err(err) = self.guard(tool.init(self.backend_config.as_deref())).await {
            warn!(error = %err, "terraform init failed");
            stage.advance(PipelineStage::Failed);
            return Ok(DriftResult::failed(project, self.tools.version(), "init"));
        }
        stage.advance(PipelineStage::Initialized);

        let tool_version = match self.guard(tool.show_state()).await {
            Ok(snapshot) if !snapshot.terraform_version.is_empty() => {
                debug!(resources = snapshot.resources.len(), "read state");
                snapshot.terraform_version
            }
            Ok(_) => self.tools.version().to_string(),
            Err(err) => {
                warn!(error = %err, "could not read state");
                self.tools.version().to_string()
            }
        };

        stage.advance(PipelineStage::Planning);
        let plan_file = format!("{name}.tfplan");
        let plan = self.guard(tool.plan(&plan_file)).await;
        if let Err(err) = &plan {
            warn!(error = %err, "terraform plan failed");
            stage.advance(PipelineStage::Failed);
            return Ok(DriftResult {
                project_name: name,
                project_path: project.to_path_buf(),
                tool_version,
                counts: ChangeCounts::ZERO,
                summary: classify_plan(&plan, None),
                plan_output: None,
            });
        }
        stage.advance(PipelineStage::Planned);

        stage.advance(PipelineStage::ExtractingCounts);
        let plan_path = project.join(&plan_file);
        let (counts, plan_output, artifact_error) =
            match self.guard(tool.show_plan_raw(&plan_path)).await {
                Ok(raw) if raw.trim().is_empty() => {
                    debug!("plan artifact is empty");
                    (ChangeCounts::ZERO, None, None)
                }
                Ok(raw) => (counts_from(&raw), Some(trim_plan(&raw).to_string()), None),
                Err(err) => {
                    warn!(error = %err, "could not read plan artifact");
                    (ChangeCounts::ZERO, None, Some(err))
                }
            };

        let summary = classify_plan(&plan, artifact_error.as_ref());
        stage.advance(PipelineStage::Complete);
        info!(
            summary = %summary,
            add = counts.add,
            change = counts.change,
            destroy = counts.destroy,
            "project scanned"
        );

        Ok(DriftResult {
            project_name: name,
            project_path: project.to_path_buf(),
            tool_version,
            counts,
            summary,
            plan_output,
        })
    }

    /// Removes the cached working state so `init` starts clean.
    fn reset(&self, project: &Path) {
        let cache_dir = project.join(".terraform");
        if self.fs.exists(&cache_dir) {
            debug!(path = %cache_dir.display(), "removing terraform cache");
            if let Err(err) = self.fs.remove_dir_all(&cache_dir) {
                warn!(path = %cache_dir.display(), error = %err, "cache cleanup failed");
            }
        }

        let lock_file = project.join(".terraform.lock.hcl");
        if self.fs.exists(&lock_file) {
            debug!(path = %lock_file.display(), "removing dependency lock file");
            if let Err(err) = self.fs.remove_file(&lock_file) {
                warn!(path = %lock_file.display(), error = %err, "lock file cleanup failed");
            }
        }
    }

    /// Runs one tool call under the timeout and cancellation token.
    async fn guard<T>(&self, call: ToolFuture<'_, T>) -> Result<T, ToolError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ToolError::Cancelled),
            outcome = tokio::time::timeout(self.tool_timeout, call) => match outcome {
                Ok(result) => result,
                Err(_) => Err(ToolError::TimedOut(self.tool_timeout)),
            },
        }
    }
}

fn counts_from(raw_plan: &str) -> ChangeCounts {
    let Some(line) = find_summary_line(raw_plan) else {
        warn!("plan artifact has no summary line");
        return ChangeCounts::ZERO;
    };
    extract_counts(&line).unwrap_or_else(|err| {
        warn!(error = %err, "could not parse change counts");
        ChangeCounts::ZERO
    })
}
