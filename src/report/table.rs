//! Console tables for stdout.

use std::fmt::Write as _;

use console::{measure_text_width, truncate_str};

use super::{drifted_by_name, DRIFT_COLUMNS};
use crate::drift::ResultAggregate;

/// Printed instead of an empty drift table.
pub const NO_DRIFT_MESSAGE: &str = "No Drift detected for the current infrastructure";

const FAILED_HEADING: &str = "Failed projects";
const FAILED_COLUMNS: [&str; 3] = ["Project Name", "Version", "Information"];
const MAX_REASON_WIDTH: usize = 80;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Renders the drift table, followed by a table of failed projects if any.
#[must_use]
pub fn render(aggregate: &ResultAggregate) -> String {
    let drifted = drifted_by_name(aggregate);
    let mut out = if drifted.is_empty() {
        format!("{NO_DRIFT_MESSAGE}\n")
    } else {
        let rows: Vec<Vec<String>> = drifted
            .iter()
            .map(|r| {
                vec![
                    r.project_name.clone(),
                    r.tool_version.clone(),
                    r.counts.add.to_string(),
                    r.counts.change.to_string(),
                    r.counts.destroy.to_string(),
                    r.summary.to_string(),
                ]
            })
            .collect();
        let aligns = [Align::Left, Align::Left, Align::Right, Align::Right, Align::Right, Align::Left];
        grid(&DRIFT_COLUMNS, &aligns, &rows)
    };

    let mut failed: Vec<_> = aggregate.failed().collect();
    if !failed.is_empty() {
        failed.sort_by(|a, b| a.project_name.cmp(&b.project_name));
        let rows: Vec<Vec<String>> = failed
            .iter()
            .map(|r| {
                let summary = r.summary.to_string();
                let first_line = summary.lines().next().unwrap_or_default();
                vec![
                    r.project_name.clone(),
                    r.tool_version.clone(),
                    truncate_str(first_line, MAX_REASON_WIDTH, "…").into_owned(),
                ]
            })
            .collect();
        let _ = writeln!(out, "\n{FAILED_HEADING}");
        out.push_str(&grid(&FAILED_COLUMNS, &[Align::Left; 3], &rows));
    }
    out
}

/// Draws a light box table with a rule between every row.
fn grid(headers: &[&str], aligns: &[Align], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| measure_text_width(h)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(measure_text_width(cell));
        }
    }

    let mut out = String::new();
    out.push_str(&rule(&widths, '┌', '┬', '┐'));
    let header: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    out.push_str(&line(&header, &widths, &vec![Align::Left; widths.len()]));
    for row in rows {
        out.push_str(&rule(&widths, '├', '┼', '┤'));
        out.push_str(&line(row, &widths, aligns));
    }
    out.push_str(&rule(&widths, '└', '┴', '┘'));
    out
}

fn rule(widths: &[usize], left: char, middle: char, right: char) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}\n", segments.join(&middle.to_string()))
}

fn line(cells: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let mut out = String::from("│");
    for ((cell, width), align) in cells.iter().zip(widths).zip(aligns) {
        let pad = " ".repeat(width.saturating_sub(measure_text_width(cell)));
        match align {
            Align::Left => {
                let _ = write!(out, " {cell}{pad} │");
            }
            Align::Right => {
                let _ = write!(out, " {pad}{cell} │");
            }
        }
    }
    out.push('\n');
    out
}
