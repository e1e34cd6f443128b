//! Coverage module
//!
//! Provides:
//! - Cobertura, Clover and JaCoCo XML parsing
//! - LCOV text parsing
//! - Per-file uncovered/measured line queries with per-run caching

mod clover;
mod cobertura;
mod jacoco;
mod lcov;

pub use clover::*;
pub use cobertura::*;
pub use jacoco::*;
pub use lcov::*;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use thiserror::Error;

use crate::lineset::LineSet;
use crate::paths;
use crate::violations::{Violation, ViolationReporter};

#[derive(Debug, Error)]
pub enum CoverageError {
    /// The report looks like neither a known XML dialect nor LCOV. Fatal.
    #[error("unsupported coverage report format: {0}")]
    UnsupportedFormat(String),
    /// One report source is malformed; the caller skips it and keeps going.
    #[error("malformed coverage report: {0}")]
    Malformed(String),
}

/// Supported coverage report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Cobertura,
    Clover,
    Jacoco,
    Lcov,
}

/// Detect the format of a coverage report by extension and content.
pub fn detect_format(path: &Path, content: &str) -> Result<ReportFormat, CoverageError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if ext == "info" || ext == "lcov" {
        return Ok(ReportFormat::Lcov);
    }

    if content.contains("<report") {
        return Ok(ReportFormat::Jacoco);
    }
    if content.contains("<coverage") {
        if content.contains("clover") {
            return Ok(ReportFormat::Clover);
        }
        return Ok(ReportFormat::Cobertura);
    }
    if content
        .lines()
        .any(|l| l.starts_with("SF:") || l.starts_with("TN:") || l.starts_with("DA:"))
    {
        return Ok(ReportFormat::Lcov);
    }

    Err(CoverageError::UnsupportedFormat(path.display().to_string()))
}

/// One file as reported by a single coverage source.
#[derive(Debug, Clone, Default)]
pub struct ReportedFile {
    /// Normalized candidate paths that may identify this file (the reported
    /// path itself plus each source-root join).
    pub candidates: Vec<String>,
    /// Execution count per measured line, additive when a line repeats.
    pub line_hits: BTreeMap<u32, u64>,
}

impl ReportedFile {
    pub fn record(&mut self, line: u32, hits: u64) {
        *self.line_hits.entry(line).or_insert(0) += hits;
    }

    fn matches(&self, query: &str) -> bool {
        self.candidates.iter().any(|c| paths::paths_equal(c, query))
    }
}

/// The parse result of one coverage report source.
#[derive(Debug, Clone, Default)]
pub struct ParsedReport {
    pub files: Vec<ReportedFile>,
}

impl ParsedReport {
    /// Combined line hits for every reported file matching `query`.
    fn hits_for(&self, query: &str) -> Option<BTreeMap<u32, u64>> {
        let mut combined: Option<BTreeMap<u32, u64>> = None;
        for file in self.files.iter().filter(|f| f.matches(query)) {
            let map = combined.get_or_insert_with(BTreeMap::new);
            for (line, hits) in &file.line_hits {
                *map.entry(*line).or_insert(0) += hits;
            }
        }
        combined
    }
}

/// Per-file analysis cached for the lifetime of one run.
#[derive(Debug, Clone, Default)]
struct FileCoverage {
    violations: Vec<Violation>,
    measured: LineSet,
}

/// Queries uncovered/measured lines across one or more coverage sources.
///
/// When several sources report the same file, a line counts as uncovered
/// only if every source that measured it marks it uncovered (intersection),
/// while measured lines accumulate across sources (union). This merges
/// coverage from multiple test runs conservatively; reported numbers depend
/// on the asymmetry staying exactly as is.
pub struct CoverageReports {
    name: String,
    sources: Vec<ParsedReport>,
    cache: HashMap<String, FileCoverage>,
}

impl CoverageReports {
    /// Load and parse report files, auto-detecting each format.
    ///
    /// An unrecognizable format is fatal. A malformed source is logged and
    /// skipped so the remaining sources still contribute.
    pub fn load(report_paths: &[std::path::PathBuf], src_roots: &[String]) -> Result<Self> {
        let mut sources = Vec::new();
        for path in report_paths {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read coverage report: {}", path.display()))?;
            let format = detect_format(path, &content)?;
            let parsed = match format {
                ReportFormat::Cobertura => parse_cobertura_string(&content),
                ReportFormat::Clover => parse_clover_string(&content),
                ReportFormat::Jacoco => parse_jacoco_string(&content, src_roots),
                ReportFormat::Lcov => parse_lcov_string(&content),
            };
            match parsed {
                Ok(report) => sources.push(report),
                Err(CoverageError::Malformed(msg)) => {
                    eprintln!(
                        "{} skipping malformed coverage report {}: {}",
                        "Warning:".yellow().bold(),
                        path.display(),
                        msg
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        let name = report_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Self::from_parsed(name, sources))
    }

    /// Build from already-parsed sources (used by tests).
    pub fn from_parsed(name: impl Into<String>, sources: Vec<ParsedReport>) -> Self {
        Self {
            name: name.into(),
            sources,
            cache: HashMap::new(),
        }
    }

    /// Drop the per-run analysis cache.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn analyze(&mut self, src_path: &str) -> &FileCoverage {
        let query = paths::normalize(src_path);
        if !self.cache.contains_key(&query) {
            let mut uncovered: Option<LineSet> = None;
            let mut measured = LineSet::new();

            for source in &self.sources {
                let Some(hits) = source.hits_for(&query) else {
                    continue;
                };
                let mut source_uncovered = LineSet::new();
                for (line, count) in &hits {
                    measured.insert(*line);
                    if *count == 0 {
                        source_uncovered.insert(*line);
                    }
                }
                uncovered = Some(match uncovered {
                    Some(prev) => prev.intersect(&source_uncovered),
                    None => source_uncovered,
                });
            }

            let violations = uncovered
                .unwrap_or_default()
                .iter()
                .map(Violation::uncovered)
                .collect();
            self.cache.insert(
                query.clone(),
                FileCoverage {
                    violations,
                    measured,
                },
            );
        }
        &self.cache[&query]
    }
}

impl ViolationReporter for CoverageReports {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn violations(&mut self, src_path: &str) -> Result<Vec<Violation>> {
        Ok(self.analyze(src_path).violations.clone())
    }

    fn measured_lines(&mut self, src_path: &str) -> Result<Option<LineSet>> {
        Ok(Some(self.analyze(src_path).measured.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(path: &str, hits: &[(u32, u64)]) -> ParsedReport {
        let mut file = ReportedFile {
            candidates: vec![path.to_string()],
            ..Default::default()
        };
        for (line, count) in hits {
            file.record(*line, *count);
        }
        ParsedReport { files: vec![file] }
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format(Path::new("cov.info"), "").unwrap(),
            ReportFormat::Lcov
        );
        assert_eq!(
            detect_format(Path::new("cov.xml"), "<coverage line-rate=\"1\">").unwrap(),
            ReportFormat::Cobertura
        );
        assert_eq!(
            detect_format(Path::new("cov.xml"), "<coverage clover=\"4.4\">").unwrap(),
            ReportFormat::Clover
        );
        assert_eq!(
            detect_format(Path::new("cov.xml"), "<report name=\"app\">").unwrap(),
            ReportFormat::Jacoco
        );
        assert_eq!(
            detect_format(Path::new("cov.txt"), "SF:a.ts\nDA:1,0\n").unwrap(),
            ReportFormat::Lcov
        );
        assert!(detect_format(Path::new("cov.bin"), "garbage").is_err());
    }

    #[test]
    fn test_single_source_uncovered() {
        let mut reports = CoverageReports::from_parsed(
            "test",
            vec![report_with("src/app.rs", &[(1, 3), (2, 0), (3, 1)])],
        );

        let violations = reports.violations("src/app.rs").unwrap();
        assert_eq!(violations, vec![Violation::uncovered(2)]);
        let measured = reports.measured_lines("src/app.rs").unwrap().unwrap();
        assert_eq!(measured.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_violations_subset_of_measured() {
        let mut reports = CoverageReports::from_parsed(
            "test",
            vec![report_with("src/app.rs", &[(1, 0), (5, 0), (9, 2)])],
        );
        let violations = reports.violations("src/app.rs").unwrap();
        let measured = reports.measured_lines("src/app.rs").unwrap().unwrap();
        assert!(violations.iter().all(|v| measured.contains(v.line)));
    }

    #[test]
    fn test_two_sources_intersect_violations_union_measured() {
        // source1 marks line 5 uncovered, source2 marks it covered
        let mut reports = CoverageReports::from_parsed(
            "test",
            vec![
                report_with("src/app.rs", &[(5, 0), (6, 1)]),
                report_with("src/app.rs", &[(5, 2), (7, 0)]),
            ],
        );

        let violations = reports.violations("src/app.rs").unwrap();
        assert!(!violations.iter().any(|v| v.line == 5));

        let measured = reports.measured_lines("src/app.rs").unwrap().unwrap();
        assert_eq!(measured.as_slice(), &[5, 6, 7]);
    }

    #[test]
    fn test_unknown_file_has_empty_measured() {
        let mut reports = CoverageReports::from_parsed("test", vec![]);
        assert!(reports.violations("nope.rs").unwrap().is_empty());
        assert!(reports
            .measured_lines("nope.rs")
            .unwrap()
            .unwrap()
            .is_empty());
    }
}
