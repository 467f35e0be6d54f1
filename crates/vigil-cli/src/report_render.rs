use std::fmt::Write as _;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use vigil_maintainers::{MaintainerActivityReport, StepStatus};

use crate::cli_args::CliReportFormat;

pub(crate) fn render_report(
    report: &MaintainerActivityReport,
    format: CliReportFormat,
) -> Result<String> {
    match format {
        CliReportFormat::Json => {
            serde_json::to_string_pretty(report).context("failed to serialize activity report")
        }
        CliReportFormat::Text => Ok(render_text(report)),
    }
}

fn render_text(report: &MaintainerActivityReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "project {} activity after {}",
        report.project_id,
        report.cutoff.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    if report.activity.is_empty() {
        let _ = writeln!(out, "no privileged accounts");
    }
    for (handle, active) in &report.activity {
        match report.evidence.get(handle) {
            Some(evidence) if *active => {
                let _ = writeln!(
                    out,
                    "  active    {handle} ({} at {})",
                    evidence.step,
                    evidence.occurred_at.to_rfc3339_opts(SecondsFormat::Secs, true)
                );
            }
            _ if *active => {
                let _ = writeln!(out, "  active    {handle}");
            }
            _ => {
                let _ = writeln!(out, "  inactive  {handle}");
            }
        }
    }
    for outcome in &report.steps {
        let _ = match &outcome.status {
            StepStatus::Completed { newly_active } => {
                writeln!(out, "step {}: completed, +{newly_active}", outcome.step)
            }
            StepStatus::Failed {
                newly_active,
                message,
            } => writeln!(
                out,
                "step {}: failed, +{newly_active}: {message}",
                outcome.step
            ),
        };
    }
    if report.early_terminated {
        let _ = writeln!(out, "stopped early: every privileged account confirmed");
    }
    out
}
