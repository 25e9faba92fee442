//! Drift result records and the per-scan aggregate.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Planned resource additions, in-place changes and destructions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeCounts {
    /// Resources to add.
    pub add: u32,
    /// Resources to change in place.
    pub change: u32,
    /// Resources to destroy.
    pub destroy: u32,
}

impl ChangeCounts {
    /// No pending changes.
    pub const ZERO: Self = Self { add: 0, change: 0, destroy: 0 };

    /// Creates counts from add/change/destroy values.
    #[must_use]
    pub const fn new(add: u32, change: u32, destroy: u32) -> Self {
        Self { add, change, destroy }
    }

    /// Returns `true` if nothing would change.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.add == 0 && self.change == 0 && self.destroy == 0
    }
}

/// Outcome classification for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DriftSummary {
    /// The plan found nothing to do.
    NoChange,
    /// The plan found pending changes.
    DriftDetected,
    /// A step failed; the reason names the step.
    Failed(String),
    /// The plan exited with a code outside the detailed-exitcode contract.
    UnknownExitCode(i32),
}

impl DriftSummary {
    /// Returns `true` for [`DriftSummary::DriftDetected`].
    #[must_use]
    pub const fn is_drift(&self) -> bool {
        matches!(self, Self::DriftDetected)
    }

    /// Returns `true` when the project could not be evaluated.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::UnknownExitCode(_))
    }
}

impl fmt::Display for DriftSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChange => f.write_str("No changes."),
            Self::DriftDetected => f.write_str("Drift detected for Plan."),
            Self::Failed(reason) => write!(f, "Failed: {reason}"),
            Self::UnknownExitCode(code) => write!(f, "Improper exit code of {code} returned."),
        }
    }
}

/// The outcome of scanning one project.
///
/// Built once by the pipeline and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftResult {
    /// Final path component of the project directory.
    pub project_name: String,
    /// The project directory.
    pub project_path: PathBuf,
    /// Tool version recorded in state, or the bound version when unknown.
    pub tool_version: String,
    /// Planned changes; zero unless a plan artifact was parsed.
    pub counts: ChangeCounts,
    /// Outcome classification.
    pub summary: DriftSummary,
    /// Human-readable plan body, when one was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_output: Option<String>,
}

impl DriftResult {
    /// Creates a failed result with zero counts.
    pub fn failed(project: &Path, tool_version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            project_name: project_name(project),
            project_path: project.to_path_buf(),
            tool_version: tool_version.into(),
            counts: ChangeCounts::ZERO,
            summary: DriftSummary::Failed(reason.into()),
            plan_output: None,
        }
    }
}

/// Derives a project's display name from its directory.
#[must_use]
pub fn project_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// All results of one scan, in arrival order.
///
/// Holds exactly one [`DriftResult`] per submitted project. Match results to
/// projects by [`DriftResult::project_path`], never by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultAggregate {
    scan_id: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    results: Vec<DriftResult>,
}

impl ResultAggregate {
    /// Seals a finished scan's results.
    #[must_use]
    pub fn new(
        scan_id: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        results: Vec<DriftResult>,
    ) -> Self {
        Self { scan_id: scan_id.into(), started_at, finished_at, results }
    }

    /// Identifier of the scan.
    #[must_use]
    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    /// When the scan started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the last result arrived.
    #[must_use]
    pub const fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// All results in arrival order.
    #[must_use]
    pub fn results(&self) -> &[DriftResult] {
        &self.results
    }

    /// Number of results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if no projects were scanned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Looks up a result by project name.
    #[must_use]
    pub fn get(&self, project_name: &str) -> Option<&DriftResult> {
        self.results.iter().find(|r| r.project_name == project_name)
    }

    /// Results whose plan found drift.
    pub fn drifted(&self) -> impl Iterator<Item = &DriftResult> {
        self.results.iter().filter(|r| r.summary.is_drift())
    }

    /// Results that could not be evaluated.
    pub fn failed(&self) -> impl Iterator<Item = &DriftResult> {
        self.results.iter().filter(|r| r.summary.is_failure())
    }

    /// Returns `true` if any project drifted.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        self.drifted().next().is_some()
    }
}
