//! Output renderers and formatting helpers for CLI commands.

use std::fmt::Write as _;

use anyhow::anyhow;
use serde::Serialize;
use updraft_core::{SkipReason, SkippedLine, Version};
use updraft_engine::{PatchPlan, RunSummary};

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};

/// Installed and tool versions reported by `updraft version`.
#[derive(Debug, Serialize)]
pub(crate) struct VersionReport {
    pub(crate) tool: &'static str,
    pub(crate) build_sha: String,
    pub(crate) installed: Version,
    pub(crate) marker_present: bool,
}

pub(crate) fn render_summary(summary: &RunSummary, format: OutputFormat) -> CliResult<()> {
    let text = match format {
        OutputFormat::Json => to_json(summary)?,
        OutputFormat::Table => summary_table(summary),
    };
    println!("{text}");
    Ok(())
}

pub(crate) fn render_plan(plan: &PatchPlan, format: OutputFormat) -> CliResult<()> {
    let text = match format {
        OutputFormat::Json => to_json(plan)?,
        OutputFormat::Table => plan_table(plan),
    };
    println!("{text}");
    Ok(())
}

pub(crate) fn render_version(report: &VersionReport, format: OutputFormat) -> CliResult<()> {
    let text = match format {
        OutputFormat::Json => to_json(report)?,
        OutputFormat::Table => format!(
            "updraft {} ({})\ninstalled: {}{}",
            report.tool,
            report.build_sha,
            report.installed,
            if report.marker_present { "" } else { " (baseline)" }
        ),
    };
    println!("{text}");
    Ok(())
}

fn to_json(value: &impl Serialize) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

pub(crate) fn summary_table(summary: &RunSummary) -> String {
    let mut out = String::new();
    if !summary.advanced() {
        let _ = writeln!(out, "already current at {}", summary.from);
    } else {
        let _ = writeln!(out, "updated {} -> {}", summary.from, summary.to);
        let _ = writeln!(out, "{:<20} {:>8} {:>8}", "VERSION", "APPLIED", "SKIPPED");
        for report in &summary.repositories {
            let _ = writeln!(
                out,
                "{:<20} {:>8} {:>8}",
                report.version.to_string(),
                report.entries_applied,
                report.entries_skipped
            );
        }
    }
    write_skipped(&mut out, &summary.skipped_lines);
    let _ = write!(out, "run: {}", summary.run_id);
    out
}

pub(crate) fn plan_table(plan: &PatchPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "installed: {}", plan.installed);
    if plan.is_current() {
        let _ = write!(out, "nothing to apply");
    } else {
        let _ = writeln!(out, "target: {}", plan.target());
        for repository in &plan.chain.repositories {
            let _ = writeln!(out, "{} ({} entries)", repository.version(), repository.len());
            for entry in repository.entries() {
                let _ = writeln!(out, "  {entry}");
            }
        }
    }
    write_skipped(&mut out, &plan.chain.skipped);
    out.trim_end().to_string()
}

fn write_skipped(out: &mut String, skipped: &[SkippedLine]) {
    if skipped.is_empty() {
        return;
    }
    let _ = writeln!(out, "skipped lines:");
    for line in skipped {
        let _ = writeln!(
            out,
            "  line {}: {} ({})",
            line.line,
            line.text,
            skip_reason_label(&line.reason)
        );
    }
}

#[must_use]
pub(crate) fn skip_reason_label(reason: &SkipReason) -> String {
    match reason {
        SkipReason::UnknownOperation { code } => format!("unknown operation '{code}'"),
        SkipReason::TooFewFields {
            op,
            required,
            found,
        } => format!("{op} needs {required} fields, found {found}"),
        SkipReason::OrphanEntry => "entry before any version header".to_string(),
        SkipReason::UnsafePath { field } => format!("unsafe path '{field}'"),
        SkipReason::AlreadyRegistered => "duplicate entry".to_string(),
    }
}
