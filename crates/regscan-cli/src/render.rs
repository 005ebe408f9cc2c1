//! Report presentation: aligned text table or JSON

use regscan_core::{ClassificationResult, ScanReport};
use serde_json::Value;
use std::fmt::Write as _;

const HEADERS: [&str; 5] = [
    "Project ID",
    "Legacy API Enabled",
    "Legacy Images Found",
    "Next-Gen API Enabled",
    "Notes",
];

fn cells(row: &ClassificationResult) -> [&str; 5] {
    [
        row.project_id.as_str(),
        row.legacy_api.label(),
        row.usage.label(),
        row.next_gen_api.label(),
        row.note.as_str(),
    ]
}

/// Render the report as a left-aligned text table
///
/// Skipped projects of a cancelled run are listed after the table.
pub(crate) fn table(report: &ScanReport) -> String {
    let mut widths = HEADERS.map(str::len);
    for row in report.rows() {
        for (width, cell) in widths.iter_mut().zip(cells(row)) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS, &widths);
    push_line(&mut out, &widths.map(|width| "-".repeat(width)), &widths);
    for row in report.rows() {
        push_line(&mut out, &cells(row), &widths);
    }

    if !report.skipped.is_empty() {
        let _ = writeln!(
            out,
            "\nScan interrupted; {} project(s) not scanned:",
            report.skipped.len()
        );
        for id in &report.skipped {
            let _ = writeln!(out, "  {id}");
        }
    }
    out
}

fn push_line<S: AsRef<str>>(out: &mut String, cells: &[S; 5], widths: &[usize; 5]) {
    let line = cells
        .iter()
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Render the report as pretty JSON, adding `legacy_residue` to each row
///
/// # Errors
/// Returns an error if the report cannot be serialized
pub(crate) fn json(report: &ScanReport) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(report)?;
    if let Some(Value::Array(rows)) = value.get_mut("rows") {
        for (row, result) in rows.iter_mut().zip(report.rows()) {
            if let Value::Object(fields) = row {
                fields.insert(
                    "legacy_residue".to_string(),
                    Value::Bool(result.legacy_residue()),
                );
            }
        }
    }
    serde_json::to_string_pretty(&value)
}
