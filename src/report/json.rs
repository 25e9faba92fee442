//! Machine-readable report.

use crate::drift::ResultAggregate;

/// Serializes the whole aggregate, failed and clean projects included.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(aggregate: &ResultAggregate) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(aggregate)
}
