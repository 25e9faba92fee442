//! Static HTML drift report.
//!
//! One sortable table of drifted projects. Clicking a row reveals the trimmed
//! plan text beneath it.

use std::fmt::Write as _;

use super::{drifted_by_name, DRIFT_COLUMNS};
use crate::drift::ResultAggregate;

const HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8" />
  <title>Terraform Drift Report</title>
  <script src="https://www.kryogenix.org/code/browser/sorttable/sorttable.js"></script>
  <style>
    body {
      font-family: sans-serif;
      background: linear-gradient(to left bottom, rgb(243, 244, 234) 0%, rgb(223, 220, 220) 100%);
      margin: 0;
      font-size: 16px;
      padding: 16px;
      color: rgb(80, 78, 78);
    }
    h1 { margin-top: 0; margin-bottom: 1.5rem; }
    hr { margin: 1.5rem 0; }
    table {
      width: 100%;
      table-layout: fixed;
      border-collapse: collapse;
      color: #2e2e2e;
    }
    table, th, td { border: 1px solid black; }
    th, td { padding: 10px; }
    th { text-align: center; }
    td { text-align: right; }
    td:first-of-type { text-align: left; }
    table tr:hover { background-color: #f2f2f2; }
    pre { text-align: left; white-space: pre-wrap; }
    .details-row { display: none; }
    .clickable-row { cursor: pointer; }
    .clickable-row:hover { background-color: #e8f4fd !important; }
  </style>
</head>
<body>
  <h1>Terraform Drift Report</h1>
"#;

const SCRIPT: &str = r#"<script type="text/javascript">
function toggleRow(id) {
  const detailsRow = document.getElementById(id + '-details');
  if (!detailsRow) {
    return;
  }
  const hidden = detailsRow.style.display === 'none' || detailsRow.style.display === '';
  detailsRow.style.display = hidden ? 'table-row' : 'none';
}

function toggleAllRows() {
  const detailsRows = document.querySelectorAll('.details-row');
  const anyVisible = Array.from(detailsRows).some(row => row.style.display === 'table-row');
  detailsRows.forEach(row => {
    row.style.display = anyVisible ? 'none' : 'table-row';
  });
}

document.addEventListener('DOMContentLoaded', function() {
  document.querySelectorAll('.clickable-row').forEach(function(row) {
    row.addEventListener('click', function() {
      toggleRow(row.id);
    });
  });
});
</script>
"#;

/// Renders the full report page.
#[must_use]
pub fn render(aggregate: &ResultAggregate) -> String {
    let mut page = String::from(HEAD);
    let _ = writeln!(
        page,
        "  <p>Scan {} finished {}</p>",
        escape(aggregate.scan_id()),
        aggregate.finished_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    page.push_str("  <button onclick=\"toggleAllRows()\">Expand/Collapse All</button>\n");
    page.push_str("  <hr />\n");
    page.push_str("<table class=\"sortable\">\n<thead>\n<tr>\n");
    for column in DRIFT_COLUMNS {
        let _ = writeln!(page, "  <th>{column}</th>");
    }
    page.push_str("</tr>\n</thead>\n<tbody>\n");

    for (index, result) in drifted_by_name(aggregate).into_iter().enumerate() {
        let id = format!("project-{index}");
        let _ = writeln!(
            page,
            "<tr id=\"{id}\" class=\"clickable-row\" data-project=\"{}\">",
            escape(&result.project_name)
        );
        let cells = [
            escape(&result.project_name),
            escape(&result.tool_version),
            result.counts.add.to_string(),
            result.counts.change.to_string(),
            result.counts.destroy.to_string(),
            escape(&result.summary.to_string()),
        ];
        for cell in cells {
            let _ = writeln!(page, "  <td>{cell}</td>");
        }
        page.push_str("</tr>\n");

        let plan = result.plan_output.as_deref().unwrap_or_default();
        let _ = writeln!(
            page,
            "<tr id=\"{id}-details\" class=\"details-row\"><td colspan=\"{}\"><pre><code>{}</code></pre></td></tr>",
            DRIFT_COLUMNS.len(),
            escape(plan)
        );
    }

    page.push_str("</tbody>\n</table>\n");
    page.push_str(SCRIPT);
    page.push_str("</body>\n</html>\n");
    page
}

/// Escapes text for use in element content and quoted attributes.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
