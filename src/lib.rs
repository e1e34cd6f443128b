//! Diffcover - diff-aware coverage and quality gate
//!
//! A library for scoring only the changed region of a source tree:
//! - Unified diff parsing into per-file changed-line sets
//! - Cobertura/Clover/JaCoCo/LCOV coverage extraction
//! - Regex and XML quality (lint) report extraction
//! - Diff-violation aggregation into per-file and total statistics
//! - Context-padded snippet ranges for excerpt display

pub mod aggregate;
pub mod config;
pub mod coverage;
pub mod diff;
pub mod lineset;
pub mod paths;
pub mod quality;
pub mod report;
pub mod snippet;
pub mod violations;

pub use aggregate::{analyze, display_percent, DiffViolations, FileViolations};
pub use config::Config;
pub use coverage::CoverageReports;
pub use diff::{parse_diff, synthesize_untracked, DiffParseError, DiffResult, GitDiff, RangeNotation};
pub use lineset::LineSet;
pub use quality::{driver_by_name, QualityReports};
pub use report::{build_report, print_summary, write_json, ReportDict};
pub use snippet::{ranges, SnippetRange};
pub use violations::{Violation, ViolationReporter};
