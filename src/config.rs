use anyhow::{Context, Result};
use glob::Pattern;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::diff::RangeNotation;

fn default_compare_branch() -> String {
    "origin/main".to_string()
}

fn default_range_notation() -> String {
    "...".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Branch to diff against.
    #[serde(default = "default_compare_branch")]
    pub compare_branch: String,

    /// Fail the run when total percent covered drops below this.
    #[serde(default)]
    pub fail_under: f64,

    /// Include globs; empty means all changed files.
    #[serde(default)]
    pub include: Vec<String>,

    /// Exclude globs, applied after includes.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Pass whitespace suppression to the diff producer.
    #[serde(default)]
    pub ignore_whitespace: bool,

    /// Skip the staged-changes diff source.
    #[serde(default)]
    pub ignore_staged: bool,

    /// Skip the unstaged-changes diff source.
    #[serde(default)]
    pub ignore_unstaged: bool,

    /// Treat untracked files as fully added.
    #[serde(default)]
    pub include_untracked: bool,

    /// `...` (merge-base) or `..` (direct) compare range.
    #[serde(default = "default_range_notation")]
    pub diff_range_notation: String,

    /// Source roots for joining package-relative coverage paths.
    #[serde(default)]
    pub src_roots: Vec<String>,

    /// Report percentages with two decimals instead of truncating.
    #[serde(default)]
    pub float_percent: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compare_branch: default_compare_branch(),
            fail_under: 0.0,
            include: Vec::new(),
            exclude: Vec::new(),
            ignore_whitespace: false,
            ignore_staged: false,
            ignore_unstaged: false,
            include_untracked: false,
            diff_range_notation: default_range_notation(),
            src_roots: Vec::new(),
            float_percent: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse diffcover.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Load `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.range_notation().is_none() {
            anyhow::bail!(
                "diff_range_notation must be '...' or '..', got '{}'",
                self.diff_range_notation
            );
        }
        if !(0.0..=100.0).contains(&self.fail_under) {
            anyhow::bail!("fail_under must be between 0 and 100, got {}", self.fail_under);
        }
        for pattern in self.include.iter().chain(&self.exclude) {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        }
        Ok(())
    }

    pub fn range_notation(&self) -> Option<RangeNotation> {
        RangeNotation::parse(&self.diff_range_notation)
    }

    pub fn include_patterns(&self) -> Vec<Pattern> {
        self.include
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect()
    }

    pub fn exclude_patterns(&self) -> Vec<Pattern> {
        self.exclude
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect()
    }
}
