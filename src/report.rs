//! Report rendering for the command-line linter.

use std::fmt::Write;

use anyhow::Result;

use crate::lint::LintReport;

/// Human-readable report, one violation per line
pub fn render_text(report: &LintReport) -> String {
    if report.success {
        return "Validation successful!".to_string();
    }

    let mut out = String::from("Structure violations found:");
    for violation in &report.errors {
        let _ = write!(
            out,
            "\n- [{}] {} (start: {}, end: {}): {}",
            violation.kind,
            violation.heading_label.as_deref().unwrap_or(""),
            violation.position.start.offset,
            violation.position.end.offset,
            violation.message
        );
    }
    out
}

pub fn render_json(report: &LintReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
