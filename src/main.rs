use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use diffcover::aggregate::analyze;
use diffcover::config::Config;
use diffcover::coverage::CoverageReports;
use diffcover::diff::{parse_diff, synthesize_untracked, DiffResult, GitDiff};
use diffcover::quality::QualityReports;
use diffcover::report::{build_report, print_summary, write_json};
use diffcover::snippet;
use diffcover::violations::ViolationReporter;

const CONFIG_FILE: &str = "diffcover.toml";

#[derive(Parser)]
#[command(name = "diffcover")]
#[command(about = "Fail the build only when newly written code is under-tested or non-compliant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: diffcover.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score changed lines against one or more coverage reports
    Coverage {
        /// Coverage report files (Cobertura/Clover/JaCoCo XML or LCOV)
        #[arg(required = true)]
        reports: Vec<PathBuf>,

        /// Source roots for joining package-relative report paths
        #[arg(long)]
        src_roots: Vec<String>,

        #[command(flatten)]
        opts: CommonOpts,
    },

    /// Score changed lines against a linter's report or live output
    Quality {
        /// Quality driver: flake8, eslint, checkstyle or findbugs
        #[arg(long)]
        driver: String,

        /// Pre-generated report files (omit to run the linter per file)
        reports: Vec<PathBuf>,

        /// Absolute prefix to subtract from report paths
        #[arg(long)]
        report_root: Option<String>,

        #[command(flatten)]
        opts: CommonOpts,
    },
}

#[derive(Args)]
struct CommonOpts {
    /// Branch to diff against
    #[arg(long)]
    compare_branch: Option<String>,

    /// Fail when total percent covered is below this threshold
    #[arg(long)]
    fail_under: Option<f64>,

    /// Include glob (may repeat); default is all changed files
    #[arg(long)]
    include: Vec<String>,

    /// Exclude glob (may repeat)
    #[arg(long)]
    exclude: Vec<String>,

    /// Ignore whitespace-only changes when producing the diff
    #[arg(long)]
    ignore_whitespace: bool,

    /// Skip staged changes
    #[arg(long)]
    ignore_staged: bool,

    /// Skip unstaged changes
    #[arg(long)]
    ignore_unstaged: bool,

    /// Count untracked files as fully added
    #[arg(long)]
    include_untracked: bool,

    /// Compare range notation: "..." (merge base) or ".."
    #[arg(long)]
    diff_range_notation: Option<String>,

    /// Report percentages with two decimals instead of truncating
    #[arg(long)]
    float_percent: bool,

    /// Write the report dict as JSON to this path
    #[arg(long)]
    json_report: Option<PathBuf>,

    /// Print context-padded snippet ranges for violation clusters
    #[arg(long)]
    show_snippets: bool,
}

impl CommonOpts {
    fn apply(&self, config: &mut Config) {
        if let Some(branch) = &self.compare_branch {
            config.compare_branch = branch.clone();
        }
        if let Some(fail_under) = self.fail_under {
            config.fail_under = fail_under;
        }
        if !self.include.is_empty() {
            config.include = self.include.clone();
        }
        if !self.exclude.is_empty() {
            config.exclude = self.exclude.clone();
        }
        if let Some(notation) = &self.diff_range_notation {
            config.diff_range_notation = notation.clone();
        }
        config.ignore_whitespace |= self.ignore_whitespace;
        config.ignore_staged |= self.ignore_staged;
        config.ignore_unstaged |= self.ignore_unstaged;
        config.include_untracked |= self.include_untracked;
        config.float_percent |= self.float_percent;
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let mut config = Config::load_or_default(&config_path)?;

    match cli.command {
        Commands::Coverage {
            reports,
            src_roots,
            opts,
        } => {
            opts.apply(&mut config);
            if !src_roots.is_empty() {
                config.src_roots = src_roots;
            }
            let reporter = CoverageReports::load(&reports, &config.src_roots)?;
            run_gate(&config, Box::new(reporter), &opts)
        }
        Commands::Quality {
            driver,
            reports,
            report_root,
            opts,
        } => {
            opts.apply(&mut config);
            let reporter = QualityReports::load(&driver, &reports, report_root)?;
            run_gate(&config, Box::new(reporter), &opts)
        }
    }
}

fn run_gate(config: &Config, mut reporter: Box<dyn ViolationReporter>, opts: &CommonOpts) -> Result<()> {
    let diff = build_diff(config)?;

    let stats = analyze(
        &diff,
        reporter.as_mut(),
        &config.include_patterns(),
        &config.exclude_patterns(),
    )?;

    let report = build_report(&reporter.name(), &diff, &stats, config.float_percent);

    print_summary(&report, config.fail_under);

    if opts.show_snippets {
        print_snippets(&report);
    }

    if let Some(json_path) = &opts.json_report {
        write_json(&report, json_path)?;
        println!(
            "Report written: {}",
            json_path.display().to_string().green()
        );
    }

    if report.total_percent_covered < config.fail_under {
        std::process::exit(1);
    }

    Ok(())
}

/// Parse and merge the configured diff sources, left to right.
fn build_diff(config: &Config) -> Result<DiffResult> {
    let notation = config.range_notation().ok_or_else(|| {
        anyhow::anyhow!(
            "diff_range_notation must be '...' or '..', got '{}'",
            config.diff_range_notation
        )
    })?;
    let mut git = GitDiff::new(Path::new("."), config.ignore_whitespace, notation)?;

    let mut diff = DiffResult::new(git.diff_name(&config.compare_branch));
    diff.merge_source(parse_diff(&git.diff_committed(&config.compare_branch)?)?);
    if !config.ignore_staged {
        diff.merge_source(parse_diff(&git.diff_staged()?)?);
    }
    if !config.ignore_unstaged {
        diff.merge_source(parse_diff(&git.diff_unstaged()?)?);
    }
    if config.include_untracked {
        let untracked = git.untracked_files()?;
        let root = git.workdir()?.to_path_buf();
        diff.merge_source(synthesize_untracked(&root, &untracked)?);
    }

    Ok(diff)
}

/// Print excerpt windows around each file's violation clusters.
fn print_snippets(report: &diffcover::report::ReportDict) {
    for (src_path, stats) in &report.src_stats {
        if stats.violation_lines.is_empty() {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(src_path) else {
            continue;
        };
        let total_lines = content.lines().count() as u32;
        let violation_lines: diffcover::LineSet = stats.violation_lines.clone().into();
        for range in snippet::ranges(total_lines, &violation_lines) {
            println!("  {}:{}-{}", src_path, range.start, range.end);
        }
    }
}
