//! Unified diff text production via git2.
//!
//! The parser consumes raw diff text; this collaborator produces it, one
//! blob per source (committed, staged, unstaged) plus the untracked-file
//! list. Whitespace suppression lives here as diff options, upstream of the
//! parser, so hunk line numbers stay consistent with what git reports.

use anyhow::{Context, Result};
use git2::{Diff, DiffFormat, DiffOptions, Repository, Status, StatusOptions, Tree};
use std::path::Path;

/// The git revision-range operator used to select the compare base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeNotation {
    /// `...`: compare against the merge base of branch and HEAD.
    #[default]
    Symmetric,
    /// `..`: compare directly against the branch tip.
    Direct,
}

impl RangeNotation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "..." => Some(Self::Symmetric),
            ".." => Some(Self::Direct),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Symmetric => "...",
            Self::Direct => "..",
        }
    }
}

/// Produces diff text per source, with per-run caches.
pub struct GitDiff {
    repo: Repository,
    ignore_whitespace: bool,
    range_notation: RangeNotation,
    committed_cache: Option<String>,
    staged_cache: Option<String>,
    unstaged_cache: Option<String>,
    untracked_cache: Option<Vec<String>>,
}

impl GitDiff {
    /// Open the repository containing `path`.
    pub fn new(path: &Path, ignore_whitespace: bool, range_notation: RangeNotation) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("Failed to find git repository at {}", path.display()))?;

        Ok(Self {
            repo,
            ignore_whitespace,
            range_notation,
            committed_cache: None,
            staged_cache: None,
            unstaged_cache: None,
            untracked_cache: None,
        })
    }

    /// Root of the working tree.
    pub fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .context("Repository has no working directory (bare repo)")
    }

    /// Diff text for commits between the compare base and HEAD.
    pub fn diff_committed(&mut self, compare_branch: &str) -> Result<String> {
        if let Some(text) = &self.committed_cache {
            return Ok(text.clone());
        }

        // trees borrow the repository; they must be gone before the cache write
        let text = {
            let base_tree = self.compare_base_tree(compare_branch)?;
            let head_tree = self.head_tree()?;
            let mut opts = self.diff_options();
            let diff = self.repo.diff_tree_to_tree(
                Some(&base_tree),
                Some(&head_tree),
                Some(&mut opts),
            )?;
            render_patch(&diff)?
        };

        self.committed_cache = Some(text.clone());
        Ok(text)
    }

    /// Diff text for staged changes (HEAD tree vs index).
    pub fn diff_staged(&mut self) -> Result<String> {
        if let Some(text) = &self.staged_cache {
            return Ok(text.clone());
        }

        let text = {
            let head_tree = self.head_tree()?;
            let mut opts = self.diff_options();
            let diff = self
                .repo
                .diff_tree_to_index(Some(&head_tree), None, Some(&mut opts))?;
            render_patch(&diff)?
        };

        self.staged_cache = Some(text.clone());
        Ok(text)
    }

    /// Diff text for unstaged changes (index vs working tree).
    pub fn diff_unstaged(&mut self) -> Result<String> {
        if let Some(text) = &self.unstaged_cache {
            return Ok(text.clone());
        }

        let mut opts = self.diff_options();
        let diff = self.repo.diff_index_to_workdir(None, Some(&mut opts))?;
        let text = render_patch(&diff)?;

        self.unstaged_cache = Some(text.clone());
        Ok(text)
    }

    /// Paths of untracked files in the working tree.
    pub fn untracked_files(&mut self) -> Result<Vec<String>> {
        if let Some(files) = &self.untracked_cache {
            return Ok(files.clone());
        }

        let mut opts = StatusOptions::new();
        opts.include_untracked(true);
        opts.recurse_untracked_dirs(true);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut files = Vec::new();
        for entry in statuses.iter() {
            if entry.status().contains(Status::WT_NEW) {
                if let Some(path) = entry.path() {
                    files.push(path.to_string());
                }
            }
        }
        files.sort();

        self.untracked_cache = Some(files.clone());
        Ok(files)
    }

    /// Human-readable name of the compare selection for reports.
    pub fn diff_name(&self, compare_branch: &str) -> String {
        format!(
            "{}{}HEAD, staged and unstaged changes",
            compare_branch,
            self.range_notation.as_str()
        )
    }

    /// Drop per-run caches so the next query recomputes from the repository.
    pub fn clear_cache(&mut self) {
        self.committed_cache = None;
        self.staged_cache = None;
        self.unstaged_cache = None;
        self.untracked_cache = None;
    }

    fn diff_options(&self) -> DiffOptions {
        let mut opts = DiffOptions::new();
        if self.ignore_whitespace {
            opts.ignore_whitespace(true);
            opts.ignore_whitespace_change(true);
            opts.ignore_whitespace_eol(true);
            opts.ignore_blank_lines(true);
        }
        opts
    }

    fn head_tree(&self) -> Result<Tree<'_>> {
        Ok(self.repo.head()?.peel_to_commit()?.tree()?)
    }

    fn compare_base_tree(&self, compare_branch: &str) -> Result<Tree<'_>> {
        let branch_commit = self
            .repo
            .revparse_single(compare_branch)
            .with_context(|| format!("Failed to resolve reference: {}", compare_branch))?
            .peel_to_commit()?;

        let base_commit = match self.range_notation {
            RangeNotation::Direct => branch_commit,
            RangeNotation::Symmetric => {
                let head = self.repo.head()?.peel_to_commit()?;
                let base_oid = self.repo.merge_base(branch_commit.id(), head.id())?;
                self.repo.find_commit(base_oid)?
            }
        };

        Ok(base_commit.tree()?)
    }
}

/// Print a git2 diff as unified patch text.
fn render_patch(diff: &Diff) -> Result<String> {
    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        match line.origin() {
            '+' | '-' | ' ' => text.push(line.origin()),
            _ => {}
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;
    Ok(text)
}
