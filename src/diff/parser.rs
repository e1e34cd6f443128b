//! Unified diff parsing: which line numbers are new in each file.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::lineset::LineSet;
use crate::paths;

/// Fatal diff parse failures. Statistics computed from a half-parsed diff
/// would be meaningless, so these abort the run.
#[derive(Debug, Error)]
pub enum DiffParseError {
    #[error("could not parse source path from diff header: {0}")]
    MalformedHeader(String),
    #[error("hunk has no source file: {0}")]
    HunkWithoutFile(String),
    #[error("could not parse hunk header: {0}")]
    MalformedHunk(String),
}

/// Added and deleted line numbers for one file in one diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    /// Line numbers on the new-file side introduced by this diff.
    pub added: LineSet,
    /// Line numbers on the old-file side removed by this diff.
    pub deleted: LineSet,
}

/// Parse unified diff text into per-file added/deleted line sets.
///
/// Recognizes `diff --git a/... b/<path>` and merge-conflict `diff --cc
/// <path>` file headers and `@@ -a,b +c,d @@` hunk headers. Whitespace
/// suppression is not handled here; it belongs to whatever produced the
/// diff, since filtering lines after the fact would break the hunk
/// line-number accounting.
pub fn parse_diff(diff_text: &str) -> Result<BTreeMap<String, FileDiff>, DiffParseError> {
    let mut files: BTreeMap<String, FileDiff> = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut in_hunk = false;
    let mut old_line = 0u32;
    let mut new_line = 0u32;

    for line in diff_text.lines() {
        if line.starts_with("diff --git ") {
            let path = git_header_path(line)?;
            files.entry(path.clone()).or_default();
            current = Some(path);
            in_hunk = false;
        } else if line.starts_with("diff --cc ") {
            let path = cc_header_path(line)?;
            files.entry(path.clone()).or_default();
            current = Some(path);
            in_hunk = false;
        } else if line.starts_with("@@") {
            if current.is_none() {
                return Err(DiffParseError::HunkWithoutFile(line.to_string()));
            }
            let (old_start, new_start) = hunk_header_starts(line)?;
            old_line = old_start;
            new_line = new_start;
            in_hunk = true;
        } else if in_hunk {
            // "\ No newline at end of file" markers are not content lines
            if line.starts_with('\\') {
                continue;
            }
            if let Some(path) = &current {
                let entry = files.entry(path.clone()).or_default();
                if line.starts_with('+') {
                    entry.added.insert(new_line);
                    new_line += 1;
                } else if line.starts_with('-') {
                    entry.deleted.insert(old_line);
                    old_line += 1;
                } else {
                    // context line advances both sides
                    old_line += 1;
                    new_line += 1;
                }
            }
        }
        // index/mode/---/+++ lines between a file header and its first hunk
        // carry no line numbers and are skipped
    }

    Ok(files)
}

/// Extract the new-side path from `diff --git a/<old> b/<new>`.
fn git_header_path(line: &str) -> Result<String, DiffParseError> {
    let rest = line.strip_prefix("diff --git ").unwrap_or("");
    let path = rest
        .rfind(" b/")
        .map(|pos| &rest[pos + 3..])
        .filter(|p| !p.is_empty())
        .ok_or_else(|| DiffParseError::MalformedHeader(line.to_string()))?;
    Ok(paths::normalize(path))
}

/// Extract the path from a merge-conflict header `diff --cc <path>`.
fn cc_header_path(line: &str) -> Result<String, DiffParseError> {
    let path = line
        .strip_prefix("diff --cc ")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| DiffParseError::MalformedHeader(line.to_string()))?;
    Ok(paths::normalize(path))
}

/// Pull the old-side and new-side starting line numbers out of a hunk
/// header like `@@ -3,2 +5,4 @@` (counts are optional).
fn hunk_header_starts(line: &str) -> Result<(u32, u32), DiffParseError> {
    let err = || DiffParseError::MalformedHunk(line.to_string());

    let inner = line.strip_prefix("@@").ok_or_else(err)?;
    let end = inner.find("@@").ok_or_else(err)?;
    let inner = inner[..end].trim();

    let mut old_start = None;
    let mut new_start = None;
    for part in inner.split_whitespace() {
        if let Some(range) = part.strip_prefix('-') {
            old_start = Some(range_start(range).ok_or_else(err)?);
        } else if let Some(range) = part.strip_prefix('+') {
            new_start = Some(range_start(range).ok_or_else(err)?);
        }
    }

    match (old_start, new_start) {
        (Some(old), Some(new)) => Ok((old, new)),
        _ => Err(err()),
    }
}

/// Parse the starting line of a range like `5,2` or bare `5`.
fn range_start(range: &str) -> Option<u32> {
    range.split(',').next()?.parse().ok()
}
