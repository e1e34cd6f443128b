//! Report dict assembly and terminal summary output.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::aggregate::{display_percent, DiffViolations};
use crate::diff::DiffResult;
use crate::lineset::LineSet;

/// Machine-readable statistics for one run, consumed by rendering layers.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDict {
    pub report_name: String,
    pub diff_name: String,
    pub src_stats: BTreeMap<String, SrcStats>,
    pub total_num_lines: u64,
    pub total_num_violations: u64,
    pub total_percent_covered: f64,
    pub num_changed_lines: u64,
}

/// Per-file statistics within a [`ReportDict`].
#[derive(Debug, Clone, Serialize)]
pub struct SrcStats {
    pub percent_covered: f64,
    pub violation_lines: Vec<u32>,
    pub covered_lines: Vec<u32>,
    pub violations: Vec<(u32, Option<String>)>,
}

/// Assemble the report dict from aggregated statistics.
pub fn build_report(
    report_name: &str,
    diff: &DiffResult,
    stats: &DiffViolations,
    float_mode: bool,
) -> ReportDict {
    let mut src_stats = BTreeMap::new();

    for src_path in stats.src_paths() {
        let Some(summary) = stats.summary(src_path) else {
            continue;
        };
        let Some(percent) = stats.percent_covered(src_path) else {
            continue;
        };

        let covered: LineSet = summary
            .measured_lines
            .difference(&summary.violation_lines);

        src_stats.insert(
            src_path.to_string(),
            SrcStats {
                percent_covered: display_percent(percent, float_mode),
                violation_lines: summary.violation_lines.clone().into_vec(),
                covered_lines: covered.into_vec(),
                violations: summary
                    .violations
                    .iter()
                    .map(|v| (v.line, v.message.clone()))
                    .collect(),
            },
        );
    }

    ReportDict {
        report_name: report_name.to_string(),
        diff_name: diff.name().to_string(),
        src_stats,
        total_num_lines: stats.total_num_lines(),
        total_num_violations: stats.total_num_violations(),
        total_percent_covered: display_percent(stats.total_percent_covered(), float_mode),
        num_changed_lines: stats.num_changed_lines(),
    }
}

/// Write the report dict as pretty JSON.
pub fn write_json(report: &ReportDict, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(output_path, json)?;
    Ok(())
}

/// Print the per-file and total summary to the terminal.
pub fn print_summary(report: &ReportDict, fail_under: f64) {
    println!("Diff: {}", report.diff_name);

    if report.src_stats.is_empty() {
        println!("  No measured lines changed.");
    }
    for (src_path, stats) in &report.src_stats {
        let status = if stats.violation_lines.is_empty() {
            "✓".green()
        } else {
            "✗".red()
        };
        let lines = if stats.violation_lines.is_empty() {
            String::new()
        } else {
            format!(
                " (missing: {})",
                stats
                    .violation_lines
                    .iter()
                    .map(|l| l.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            )
        };
        println!("  {} {}: {}%{}", status, src_path, stats.percent_covered, lines);
    }

    let passed = report.total_percent_covered >= fail_under;
    let status = if passed { "✓".green() } else { "✗".red() };
    let percent = if passed {
        format!("{}%", report.total_percent_covered).green()
    } else {
        format!("{}%", report.total_percent_covered).red()
    };
    println!(
        "{} Total: {} of {} changed lines covered ({}, threshold: {}%)",
        status,
        report.total_num_lines - report.total_num_violations,
        report.total_num_lines,
        percent,
        fail_under
    );
}
