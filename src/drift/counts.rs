//! Change-count extraction from plan output.
//!
//! Pure text processing; nothing here touches the tool or the disk.

use std::sync::LazyLock;

use regex::Regex;

use super::result::ChangeCounts;
use crate::error::CountParseError;

/// Summary line substituted when the plan reports no changes.
pub const NO_CHANGES_LINE: &str = "Plan: 0 to add, 0 to change, 0 to destroy.";

const ACTIONS_HEADER: &str = "Terraform will perform the following actions";

static NO_CHANGES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bNo changes\b").expect("static regex"));
static PLAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bPlan\b").expect("static regex"));
static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?[0-9]+").expect("static regex"));

/// Parses a plan summary line into add/change/destroy counts.
///
/// A line saying "No changes" is all zeros whatever digits it contains.
/// Otherwise the first three integers are taken positionally.
///
/// # Errors
///
/// Returns [`CountParseError::MissingCounts`] with fewer than three integers
/// and [`CountParseError::InvalidNumber`] for negative or oversized ones.
pub fn extract_counts(line: &str) -> Result<ChangeCounts, CountParseError> {
    if NO_CHANGES.is_match(line) {
        return Ok(ChangeCounts::ZERO);
    }

    let tokens: Vec<&str> = INTEGER.find_iter(line).take(3).map(|m| m.as_str()).collect();
    let [add, change, destroy] = tokens[..] else {
        return Err(CountParseError::MissingCounts { line: line.to_string(), found: tokens.len() });
    };
    Ok(ChangeCounts::new(parse_count(add)?, parse_count(change)?, parse_count(destroy)?))
}

fn parse_count(token: &str) -> Result<u32, CountParseError> {
    token.parse().map_err(|_| CountParseError::InvalidNumber { token: token.to_string() })
}

/// Finds the summary line in a rendered plan.
///
/// Returns the first line mentioning `Plan`, or [`NO_CHANGES_LINE`] if a
/// "No changes" line comes first. `None` when the text has neither.
#[must_use]
pub fn find_summary_line(raw_plan: &str) -> Option<String> {
    raw_plan.lines().find_map(|line| {
        if PLAN.is_match(line) {
            Some(line.trim().to_string())
        } else if NO_CHANGES.is_match(line) {
            Some(NO_CHANGES_LINE.to_string())
        } else {
            None
        }
    })
}

/// Drops the refresh preamble from a rendered plan, keeping the action list.
#[must_use]
pub fn trim_plan(raw_plan: &str) -> &str {
    raw_plan.find(ACTIONS_HEADER).map_or(raw_plan, |idx| &raw_plan[idx..])
}
