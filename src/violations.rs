//! Shared violation types and the reporter seam between the aggregator and
//! the format-specific coverage/quality readers.

use anyhow::Result;

use crate::lineset::LineSet;

/// A single reported defect at a specific line: an uncovered line (no
/// message) or a lint finding (with message). Identity is structural, so two
/// lint messages on the same line are two violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub line: u32,
    pub message: Option<String>,
}

impl Violation {
    pub fn uncovered(line: u32) -> Self {
        Self { line, message: None }
    }

    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: Some(message.into()),
        }
    }
}

/// One source of per-file violations, queried repeatedly by the aggregator.
///
/// Implementations cache parse results on first access for the lifetime of
/// one run; `&mut self` keeps that cache an explicit field rather than a
/// process-wide global.
pub trait ViolationReporter {
    /// Display name of this reporter (e.g. the coverage report files, or the
    /// quality driver name).
    fn name(&self) -> String;

    /// All violations recorded for `src_path`, in ascending line order.
    fn violations(&mut self, src_path: &str) -> Result<Vec<Violation>>;

    /// The lines the underlying tool measured for `src_path`. `None` means
    /// the tool has no universe concept and every changed line counts as
    /// measured (raw lint output).
    fn measured_lines(&mut self, src_path: &str) -> Result<Option<LineSet>>;

    /// File extensions this reporter can score. Empty means all files.
    fn supported_extensions(&self) -> &[&str] {
        &[]
    }
}

/// True when `src_path` has one of `extensions` (or the list is empty).
pub fn extension_supported(src_path: &str, extensions: &[&str]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    match src_path.rsplit_once('.') {
        Some((_, ext)) => extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}
