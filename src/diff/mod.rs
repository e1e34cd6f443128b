//! Diff module
//!
//! Provides:
//! - Unified diff text parsing
//! - Merging of multiple diff sources (committed, staged, unstaged)
//! - Diff text production via git2

mod git;
mod parser;

pub use git::*;
pub use parser::*;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::lineset::LineSet;

/// Changed lines per file, merged across one or more diff sources.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    name: String,
    files: BTreeMap<String, FileDiff>,
}

impl DiffResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
        }
    }

    /// Display name of the diff (e.g. `origin/main...HEAD, staged and unstaged changes`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Merge one more diff source, left to right: lines deleted by this
    /// source retract previously accumulated added lines at the same path,
    /// then this source's added lines are appended.
    pub fn merge_source(&mut self, source: BTreeMap<String, FileDiff>) {
        for (path, incoming) in source {
            let entry = self.files.entry(path).or_default();
            entry.added.remove_all(&incoming.deleted);
            entry.added.extend(incoming.added.iter());
            entry.deleted.extend(incoming.deleted.iter());
        }
        // a line that ends up added is not considered deleted
        for entry in self.files.values_mut() {
            let added = entry.added.clone();
            entry.deleted.remove_all(&added);
        }
    }

    /// Changed file paths, sorted ascending.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Lines added to `src_path` by the merged diff.
    pub fn added_lines(&self, src_path: &str) -> Option<&LineSet> {
        self.files.get(src_path).map(|fd| &fd.added)
    }

    /// Lines deleted from `src_path` by the merged diff.
    pub fn deleted_lines(&self, src_path: &str) -> Option<&LineSet> {
        self.files.get(src_path).map(|fd| &fd.deleted)
    }
}

/// Synthesize a diff source for untracked files: every line counts as added.
pub fn synthesize_untracked(root: &Path, files: &[String]) -> Result<BTreeMap<String, FileDiff>> {
    let mut result = BTreeMap::new();
    for file in files {
        let full_path = root.join(file);
        if !full_path.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&full_path)
            .with_context(|| format!("Failed to read untracked file: {}", full_path.display()))?;
        let total = content.lines().count() as u32;
        let added: LineSet = (1..=total).collect();
        result.insert(
            crate::paths::normalize(file),
            FileDiff {
                added,
                deleted: LineSet::new(),
            },
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(entries: &[(&str, &[u32], &[u32])]) -> BTreeMap<String, FileDiff> {
        entries
            .iter()
            .map(|(path, added, deleted)| {
                (
                    path.to_string(),
                    FileDiff {
                        added: added.to_vec().into(),
                        deleted: deleted.to_vec().into(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_later_delete_retracts_earlier_add() {
        let mut diff = DiffResult::new("test");
        diff.merge_source(source(&[("a.rs", &[3, 4, 5], &[])]));
        diff.merge_source(source(&[("a.rs", &[9], &[4])]));

        assert_eq!(diff.added_lines("a.rs").unwrap().as_slice(), &[3, 5, 9]);
    }

    #[test]
    fn test_line_added_twice_appears_once() {
        let mut diff = DiffResult::new("test");
        diff.merge_source(source(&[("a.rs", &[3], &[])]));
        diff.merge_source(source(&[("a.rs", &[3], &[])]));

        assert_eq!(diff.added_lines("a.rs").unwrap().as_slice(), &[3]);
    }

    #[test]
    fn test_added_and_deleted_disjoint_after_merge() {
        let mut diff = DiffResult::new("test");
        diff.merge_source(source(&[("a.rs", &[5], &[5])]));
        diff.merge_source(source(&[("a.rs", &[7], &[2])]));

        let added = diff.added_lines("a.rs").unwrap();
        let deleted = diff.deleted_lines("a.rs").unwrap();
        assert!(added.intersect(deleted).is_empty());
    }

    #[test]
    fn test_files_sorted() {
        let mut diff = DiffResult::new("test");
        diff.merge_source(source(&[("b.rs", &[1], &[]), ("a.rs", &[1], &[])]));

        let files: Vec<&str> = diff.files().collect();
        assert_eq!(files, vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn test_synthesize_untracked_counts_lines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("new.rs"), "a\nb\nc\n").unwrap();

        let synthesized =
            synthesize_untracked(dir.path(), &["new.rs".to_string(), "gone.rs".to_string()])
                .unwrap();
        assert_eq!(synthesized.len(), 1);
        assert_eq!(synthesized["new.rs"].added.as_slice(), &[1, 2, 3]);
    }
}
