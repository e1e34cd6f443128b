//! Diff-violation aggregation: intersect changed lines with violation and
//! measured lines per file, and derive percentages and totals.

use std::collections::BTreeMap;

use anyhow::Result;
use glob::Pattern;

use crate::diff::DiffResult;
use crate::lineset::LineSet;
use crate::violations::{extension_supported, Violation, ViolationReporter};

/// The derived sets for one changed file. Invariant:
/// `violation_lines ⊆ measured_lines ⊆ diff lines`.
#[derive(Debug, Clone, Default)]
pub struct FileViolations {
    /// Violation lines that fall inside the diff.
    pub violation_lines: LineSet,
    /// The violations at those lines.
    pub violations: Vec<Violation>,
    /// Measured lines that fall inside the diff.
    pub measured_lines: LineSet,
}

/// Per-file and total statistics for one diff against one reporter.
#[derive(Debug, Clone, Default)]
pub struct DiffViolations {
    src_stats: BTreeMap<String, FileViolations>,
    num_changed_lines: u64,
}

/// Intersect the diff's changed lines with the reporter's violation and
/// measured lines, file by file.
///
/// `include`/`exclude` globs and the reporter's supported extensions filter
/// files before they are considered at all. Files whose measured set comes
/// out empty are dropped from the per-file stats (nothing to say about
/// them) but still contribute zero to the totals.
pub fn analyze(
    diff: &DiffResult,
    reporter: &mut dyn ViolationReporter,
    include: &[Pattern],
    exclude: &[Pattern],
) -> Result<DiffViolations> {
    let mut result = DiffViolations::default();

    let files: Vec<String> = diff.files().map(str::to_string).collect();
    for src_path in files {
        if !include.is_empty() && !include.iter().any(|p| p.matches(&src_path)) {
            continue;
        }
        if exclude.iter().any(|p| p.matches(&src_path)) {
            continue;
        }
        if !extension_supported(&src_path, reporter.supported_extensions()) {
            continue;
        }

        let Some(diff_lines) = diff.added_lines(&src_path) else {
            continue;
        };
        result.num_changed_lines += diff_lines.len() as u64;

        let measured = match reporter.measured_lines(&src_path)? {
            Some(measured) => measured.intersect(diff_lines),
            None => diff_lines.clone(),
        };

        let violations: Vec<Violation> = reporter
            .violations(&src_path)?
            .into_iter()
            .filter(|v| measured.contains(v.line))
            .collect();
        let violation_lines: LineSet = violations.iter().map(|v| v.line).collect();

        if measured.is_empty() {
            continue;
        }

        result.src_stats.insert(
            src_path,
            FileViolations {
                violation_lines,
                violations,
                measured_lines: measured,
            },
        );
    }

    Ok(result)
}

impl DiffViolations {
    /// Changed files with at least one measured line, sorted ascending.
    pub fn src_paths(&self) -> impl Iterator<Item = &str> {
        self.src_stats.keys().map(String::as_str)
    }

    pub fn summary(&self, src_path: &str) -> Option<&FileViolations> {
        self.src_stats.get(src_path)
    }

    /// Percent of measured changed lines in `src_path` free of violations.
    /// `None` when the file has no measured changed lines.
    pub fn percent_covered(&self, src_path: &str) -> Option<f64> {
        let stats = self.src_stats.get(src_path)?;
        if stats.measured_lines.is_empty() {
            return None;
        }
        Some(
            100.0
                - 100.0 * stats.violation_lines.len() as f64
                    / stats.measured_lines.len() as f64,
        )
    }

    /// Total measured changed lines across all files.
    pub fn total_num_lines(&self) -> u64 {
        self.src_stats
            .values()
            .map(|s| s.measured_lines.len() as u64)
            .sum()
    }

    /// Total violation lines across all files (a line with several messages
    /// counts once, keeping totals consistent with percentages).
    pub fn total_num_violations(&self) -> u64 {
        self.src_stats
            .values()
            .map(|s| s.violation_lines.len() as u64)
            .sum()
    }

    /// Overall percent covered; 100 when nothing was measured (vacuously
    /// fully covered).
    pub fn total_percent_covered(&self) -> f64 {
        let measured = self.total_num_lines();
        if measured == 0 {
            return 100.0;
        }
        let violations = self.total_num_violations();
        100.0 * (measured - violations) as f64 / measured as f64
    }

    /// Total added lines across all considered files, measured or not.
    pub fn num_changed_lines(&self) -> u64 {
        self.num_changed_lines
    }
}

/// Truncate toward zero by default, or round to two decimals in float mode.
pub fn display_percent(percent: f64, float_mode: bool) -> f64 {
    if float_mode {
        (percent * 100.0).round() / 100.0
    } else {
        percent.trunc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::FileDiff;
    use std::collections::BTreeMap as Map;

    /// Reporter backed by literal per-file data.
    struct FakeReporter {
        violations: Map<String, Vec<Violation>>,
        measured: Map<String, Option<LineSet>>,
        extensions: Vec<&'static str>,
    }

    impl FakeReporter {
        fn new() -> Self {
            Self {
                violations: Map::new(),
                measured: Map::new(),
                extensions: Vec::new(),
            }
        }

        fn with_file(
            mut self,
            path: &str,
            violations: &[u32],
            measured: Option<&[u32]>,
        ) -> Self {
            self.violations.insert(
                path.to_string(),
                violations.iter().map(|l| Violation::uncovered(*l)).collect(),
            );
            self.measured
                .insert(path.to_string(), measured.map(|m| m.to_vec().into()));
            self
        }
    }

    impl ViolationReporter for FakeReporter {
        fn name(&self) -> String {
            "fake".to_string()
        }

        fn violations(&mut self, src_path: &str) -> Result<Vec<Violation>> {
            Ok(self.violations.get(src_path).cloned().unwrap_or_default())
        }

        fn measured_lines(&mut self, src_path: &str) -> Result<Option<LineSet>> {
            Ok(self.measured.get(src_path).cloned().flatten())
        }

        fn supported_extensions(&self) -> &[&str] {
            &self.extensions
        }
    }

    fn diff_with(entries: &[(&str, &[u32])]) -> DiffResult {
        let mut diff = DiffResult::new("test");
        diff.merge_source(
            entries
                .iter()
                .map(|(path, added)| {
                    (
                        path.to_string(),
                        FileDiff {
                            added: added.to_vec().into(),
                            deleted: LineSet::new(),
                        },
                    )
                })
                .collect(),
        );
        diff
    }

    #[test]
    fn test_violations_intersected_with_diff() {
        let diff = diff_with(&[("a.rs", &[3, 4, 5])]);
        let mut reporter =
            FakeReporter::new().with_file("a.rs", &[4, 9], Some(&[3, 4, 5, 9]));

        let result = analyze(&diff, &mut reporter, &[], &[]).unwrap();
        let stats = result.summary("a.rs").unwrap();
        // line 9 is outside the diff
        assert_eq!(stats.violation_lines.as_slice(), &[4]);
        assert_eq!(stats.measured_lines.as_slice(), &[3, 4, 5]);
        assert_eq!(result.percent_covered("a.rs"), Some(100.0 - 100.0 / 3.0));
    }

    #[test]
    fn test_null_measured_means_all_diff_lines() {
        let diff = diff_with(&[("a.py", &[1, 2])]);
        let mut reporter = FakeReporter::new().with_file("a.py", &[1], None);

        let result = analyze(&diff, &mut reporter, &[], &[]).unwrap();
        let stats = result.summary("a.py").unwrap();
        assert_eq!(stats.measured_lines.as_slice(), &[1, 2]);
        assert_eq!(result.percent_covered("a.py"), Some(50.0));
    }

    #[test]
    fn test_unmeasured_file_excluded_from_stats() {
        let diff = diff_with(&[("a.rs", &[3]), ("b.rs", &[7])]);
        let mut reporter = FakeReporter::new()
            .with_file("a.rs", &[], Some(&[3]))
            .with_file("b.rs", &[], Some(&[]));

        let result = analyze(&diff, &mut reporter, &[], &[]).unwrap();
        let paths: Vec<&str> = result.src_paths().collect();
        assert_eq!(paths, vec!["a.rs"]);
        // b.rs still counted as changed
        assert_eq!(result.num_changed_lines(), 2);
    }

    #[test]
    fn test_total_percent_is_100_when_nothing_measured() {
        let diff = diff_with(&[("a.rs", &[1])]);
        let mut reporter = FakeReporter::new().with_file("a.rs", &[], Some(&[]));

        let result = analyze(&diff, &mut reporter, &[], &[]).unwrap();
        assert_eq!(result.total_percent_covered(), 100.0);
    }

    #[test]
    fn test_percent_in_bounds() {
        let diff = diff_with(&[("a.rs", &[1, 2, 3, 4])]);
        let mut reporter =
            FakeReporter::new().with_file("a.rs", &[1, 2, 3, 4], Some(&[1, 2, 3, 4]));

        let result = analyze(&diff, &mut reporter, &[], &[]).unwrap();
        assert_eq!(result.percent_covered("a.rs"), Some(0.0));
        assert_eq!(result.total_percent_covered(), 0.0);
    }

    #[test]
    fn test_totals_across_files() {
        let diff = diff_with(&[("a.rs", &[1, 2]), ("b.rs", &[5, 6])]);
        let mut reporter = FakeReporter::new()
            .with_file("a.rs", &[1], Some(&[1, 2]))
            .with_file("b.rs", &[], Some(&[5]));

        let result = analyze(&diff, &mut reporter, &[], &[]).unwrap();
        assert_eq!(result.total_num_lines(), 3);
        assert_eq!(result.total_num_violations(), 1);
        // 2 of 3 measured lines clean
        assert!((result.total_percent_covered() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_exclude_globs() {
        let diff = diff_with(&[("src/a.rs", &[1]), ("vendor/b.rs", &[1])]);
        let mut reporter = FakeReporter::new()
            .with_file("src/a.rs", &[], None)
            .with_file("vendor/b.rs", &[], None);

        let exclude = vec![Pattern::new("vendor/**").unwrap()];
        let result = analyze(&diff, &mut reporter, &[], &exclude).unwrap();
        let paths: Vec<&str> = result.src_paths().collect();
        assert_eq!(paths, vec!["src/a.rs"]);
    }

    #[test]
    fn test_extension_filter() {
        let diff = diff_with(&[("a.ts", &[1]), ("b.py", &[1])]);
        let mut reporter = FakeReporter::new()
            .with_file("a.ts", &[], None)
            .with_file("b.py", &[], None);
        reporter.extensions = vec!["ts"];

        let result = analyze(&diff, &mut reporter, &[], &[]).unwrap();
        let paths: Vec<&str> = result.src_paths().collect();
        assert_eq!(paths, vec!["a.ts"]);
    }

    #[test]
    fn test_display_percent_modes() {
        assert_eq!(display_percent(66.6666, false), 66.0);
        assert_eq!(display_percent(66.6666, true), 66.67);
        assert_eq!(display_percent(100.0, false), 100.0);
    }
}
