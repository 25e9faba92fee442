//! Rendering of scan results.
//!
//! Renderers are pure: they turn a [`ResultAggregate`] into text and leave
//! printing or writing files to the caller.

pub mod html;
pub mod json;
pub mod table;

use crate::drift::{DriftResult, ResultAggregate};

/// Column headings shared by the drift table and the HTML report.
pub const DRIFT_COLUMNS: [&str; 6] = ["Project Name", "Version", "Add", "Change", "Delete", "Information"];

/// Drifted results sorted by project name.
fn drifted_by_name(aggregate: &ResultAggregate) -> Vec<&DriftResult> {
    let mut rows: Vec<&DriftResult> = aggregate.drifted().collect();
    rows.sort_by(|a, b| a.project_name.cmp(&b.project_name).then_with(|| a.project_path.cmp(&b.project_path)));
    rows
}
