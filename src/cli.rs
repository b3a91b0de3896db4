//! Command-line interface module for yearsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Merging command-line flags over the configuration file
//! - Wiring the engine to the terminal (log lines, progress bar, JSON stats)

use crate::config::{ConfigError, ConfigFile, DuplicateMode, OrganizerConfig};
use crate::engine::{Organizer, RunStats};
use crate::output::{BarProgress, ConsoleLog, OutputFormatter};
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Sort the top-level files and folders of a directory into year folders.
#[derive(Debug, Clone, Parser)]
#[command(name = "yearsort", version, about)]
pub struct Cli {
    /// Directory whose top-level items are organized.
    pub source: PathBuf,

    /// Where year folders are created (defaults to SOURCE).
    #[arg(short, long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Actually move items. Without it the run is a dry run.
    #[arg(long, conflicts_with = "dry_run")]
    pub apply: bool,

    /// Only show what would happen (the default unless configured otherwise).
    #[arg(long)]
    pub dry_run: bool,

    /// Leave directories alone.
    #[arg(long)]
    pub files_only: bool,

    /// Log skipped items and every processing step.
    #[arg(short, long)]
    pub verbose: bool,

    /// What to do when the destination already exists.
    #[arg(short, long, value_enum, value_name = "MODE")]
    pub duplicates: Option<DuplicateMode>,

    /// Only organize these top-level folders (repeatable).
    #[arg(long = "include", value_name = "NAME")]
    pub include: Vec<String>,

    /// Never organize these top-level folders (repeatable, ignored with --include).
    #[arg(long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Only organize items last modified in this year.
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Only organize files with this extension (repeatable, no dot needed).
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Additional name patterns that are never organized (repeatable).
    #[arg(long = "reserve", value_name = "PATTERN")]
    pub reserve: Vec<String>,

    /// Configuration file (defaults to .yearsortrc.toml, then ~/.config/yearsort/config.toml).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the final statistics as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Do not show a progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

/// Errors that end the command before or after a run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to write statistics: {0}")]
    Json(#[from] serde_json::Error),
}

/// Builds the run configuration: the configuration file first, then any
/// flag given on the command line.
pub fn build_config(cli: &Cli, file: &ConfigFile) -> Result<OrganizerConfig, ConfigError> {
    let mut builder = file.builder_for(&cli.source);

    if let Some(target) = &cli.target {
        builder = builder.target_dir(target);
    }
    if cli.apply {
        builder = builder.dry_run(false);
    }
    if cli.dry_run {
        builder = builder.dry_run(true);
    }
    if cli.files_only {
        builder = builder.files_only(true);
    }
    if cli.verbose {
        builder = builder.verbose(true);
    }
    if let Some(mode) = cli.duplicates {
        builder = builder.duplicate_mode(mode);
    }
    if !cli.include.is_empty() {
        builder = builder.include_folders(cli.include.iter().cloned());
    }
    if !cli.exclude.is_empty() {
        builder = builder.exclude_folders(cli.exclude.iter().cloned());
    }
    if !cli.extensions.is_empty() {
        builder = builder.file_types(cli.extensions.iter().cloned());
    }
    if cli.year.is_some() {
        builder = builder.target_year(cli.year);
    }

    builder.reserve_names(cli.reserve.iter().cloned()).build()
}

/// Runs one organize with terminal output and returns its statistics.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use yearsort::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["yearsort", "/path/to/inbox", "--apply"]);
/// match run_cli(&cli) {
///     Ok(stats) => println!("Moved {} items", stats.total_moved()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<RunStats, CliError> {
    let file = ConfigFile::load(cli.config.as_deref())?;
    let config = build_config(cli, &file)?;

    if !cli.json {
        OutputFormatter::header("yearsort - organize files by year");
    }
    if config.duplicate_mode() == DuplicateMode::Interactive {
        OutputFormatter::warning_to(
            "Interactive duplicate handling is not available; duplicates will be skipped.",
            cli.json,
        );
    }

    let bar = (!cli.no_progress && !cli.json).then(|| OutputFormatter::create_progress_bar(0));

    let mut log = ConsoleLog::new().problems_only(cli.json);
    if let Some(bar) = &bar {
        log = log.with_progress_bar(bar.clone());
    }

    let mut organizer = Organizer::new(config).with_log_sink(log);
    if let Some(bar) = &bar {
        organizer = organizer.with_progress_sink(BarProgress::new(bar.clone()));
    }

    let stats = organizer.organize();

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    if cli.json {
        OutputFormatter::plain(&serde_json::to_string_pretty(&stats)?);
    }

    Ok(stats)
}
