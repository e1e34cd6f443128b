//! Quality module
//!
//! Provides:
//! - Regex-line drivers for raw linter stdout (flake8, eslint)
//! - XML drivers for structured linter reports (checkstyle, findbugs)
//! - Per-file violation queries with per-run caching and live linting

mod regex_driver;
mod xml_driver;

pub use regex_driver::*;
pub use xml_driver::*;

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use colored::Colorize;
use thiserror::Error;

use crate::lineset::LineSet;
use crate::paths;
use crate::violations::{extension_supported, Violation, ViolationReporter};

#[derive(Debug, Error)]
pub enum QualityError {
    #[error("quality driver not installed: {0}")]
    DriverNotInstalled(String),
    #[error("unknown quality driver: {0}")]
    UnknownDriver(String),
    /// One report source is malformed; the caller skips it and keeps going.
    #[error("malformed quality report: {0}")]
    Malformed(String),
}

/// One linter's extraction strategy: which files it scores, how to parse its
/// output, and (optionally) how to invoke it live.
pub trait QualityDriver {
    fn name(&self) -> &str;

    /// File extensions this driver scores (e.g. `ts`/`js` for a JS linter).
    fn supported_extensions(&self) -> &[&str];

    /// Executable plus fixed arguments for live linting, if supported.
    fn command(&self) -> Option<&[&str]> {
        None
    }

    /// Parse one report text into per-file violation lists, keyed by
    /// normalized forward-slash path.
    fn parse(&self, report: &str) -> Result<BTreeMap<String, Vec<Violation>>, QualityError>;
}

/// Look up a driver by CLI name.
pub fn driver_by_name(name: &str) -> Result<Box<dyn QualityDriver>, QualityError> {
    match name {
        "flake8" => Ok(Box::new(flake8_driver())),
        "eslint" => Ok(Box::new(eslint_driver())),
        "checkstyle" => Ok(Box::new(CheckstyleDriver)),
        "findbugs" => Ok(Box::new(FindbugsDriver)),
        other => Err(QualityError::UnknownDriver(other.to_string())),
    }
}

/// Queries lint violations per file, from pre-supplied reports or by
/// invoking the driver on demand.
pub struct QualityReports {
    driver: Box<dyn QualityDriver>,
    report_texts: Vec<String>,
    /// Optional absolute prefix subtracted from report paths to make them
    /// repository-relative.
    report_root: Option<String>,
    parsed: Option<BTreeMap<String, Vec<Violation>>>,
    live_cache: HashMap<String, Vec<Violation>>,
}

impl QualityReports {
    pub fn new(
        driver: Box<dyn QualityDriver>,
        report_texts: Vec<String>,
        report_root: Option<String>,
    ) -> Self {
        Self {
            driver,
            report_texts,
            report_root,
            parsed: None,
            live_cache: HashMap::new(),
        }
    }

    /// Read report files for `driver_name`. An empty `report_paths` selects
    /// live linting on first query instead.
    pub fn load(
        driver_name: &str,
        report_paths: &[PathBuf],
        report_root: Option<String>,
    ) -> Result<Self> {
        let driver = driver_by_name(driver_name)?;
        let mut texts = Vec::new();
        for path in report_paths {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read quality report: {}", path.display()))?;
            texts.push(text);
        }
        Ok(Self::new(driver, texts, report_root))
    }

    /// Drop per-run caches.
    pub fn clear_cache(&mut self) {
        self.parsed = None;
        self.live_cache.clear();
    }

    fn strip_report_root(&self, path: &str) -> String {
        match &self.report_root {
            Some(root) => {
                let root = paths::normalize(root);
                path.strip_prefix(&format!("{}/", root))
                    .map(str::to_string)
                    .unwrap_or_else(|| path.to_string())
            }
            None => path.to_string(),
        }
    }

    fn parsed_reports(&mut self) -> &BTreeMap<String, Vec<Violation>> {
        if self.parsed.is_none() {
            let mut merged: BTreeMap<String, Vec<Violation>> = BTreeMap::new();
            for text in &self.report_texts {
                match self.driver.parse(text) {
                    Ok(by_file) => {
                        for (file, violations) in by_file {
                            let key = self.strip_report_root(&file);
                            merged.entry(key).or_default().extend(violations);
                        }
                    }
                    Err(err) => {
                        eprintln!(
                            "{} skipping malformed {} report: {}",
                            "Warning:".yellow().bold(),
                            self.driver.name(),
                            err
                        );
                    }
                }
            }
            for violations in merged.values_mut() {
                violations.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.message.cmp(&b.message)));
            }
            self.parsed = Some(merged);
        }
        self.parsed.get_or_insert_with(BTreeMap::new)
    }

    fn live_lint(&mut self, src_path: &str) -> Result<Vec<Violation>> {
        if let Some(cached) = self.live_cache.get(src_path) {
            return Ok(cached.clone());
        }

        // a misconfigured driver must fail loudly, not score zero violations
        let command = self
            .driver
            .command()
            .ok_or_else(|| QualityError::UnknownDriver(format!(
                "driver {} requires pre-supplied reports",
                self.driver.name()
            )))?;

        // the file may be referenced by the diff but already deleted
        if !Path::new(src_path).is_file() {
            self.live_cache.insert(src_path.to_string(), Vec::new());
            return Ok(Vec::new());
        }

        let output = Command::new(command[0])
            .args(&command[1..])
            .arg(src_path)
            .output()
            .map_err(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    anyhow::Error::new(QualityError::DriverNotInstalled(
                        self.driver.name().to_string(),
                    ))
                } else {
                    anyhow::Error::new(err)
                        .context(format!("Failed to run {}", self.driver.name()))
                }
            })?;

        // linters exit non-zero when they find violations; stdout is the report
        let stdout = String::from_utf8_lossy(&output.stdout);
        let by_file = self.driver.parse(&stdout)?;

        let query = paths::normalize(src_path);
        let violations = self.violations_for(by_file, &query);

        self.live_cache.insert(src_path.to_string(), violations.clone());
        Ok(violations)
    }

    /// Pick `query`'s violations out of one parse result. Live linters often
    /// report absolute paths, so each reported path is re-rooted at the
    /// invocation directory before comparing.
    fn violations_for(
        &self,
        by_file: BTreeMap<String, Vec<Violation>>,
        query: &str,
    ) -> Vec<Violation> {
        by_file
            .into_iter()
            .find(|(file, _)| {
                let reported = paths::relative_to_cwd(&self.strip_report_root(file));
                paths::paths_equal(&reported, query)
            })
            .map(|(_, v)| v)
            .unwrap_or_default()
    }
}

impl ViolationReporter for QualityReports {
    fn name(&self) -> String {
        self.driver.name().to_string()
    }

    fn violations(&mut self, src_path: &str) -> Result<Vec<Violation>> {
        if !extension_supported(src_path, self.driver.supported_extensions()) {
            return Ok(Vec::new());
        }

        if self.report_texts.is_empty() {
            return self.live_lint(src_path);
        }

        let query = paths::normalize(src_path);
        let parsed = self.parsed_reports();
        Ok(parsed
            .iter()
            .find(|(file, _)| paths::paths_equal(file, &query))
            .map(|(_, v)| v.clone())
            .unwrap_or_default())
    }

    /// Lint output has no universe concept; every changed line is measured.
    fn measured_lines(&mut self, _src_path: &str) -> Result<Option<LineSet>> {
        Ok(None)
    }

    fn supported_extensions(&self) -> &[&str] {
        self.driver.supported_extensions()
    }
}
