//! Output formatting and styling module.
//!
//! Provides a centralized interface for all terminal output: colored log
//! lines, the progress bar, and the sinks that connect both to the engine.
//! The engine itself never prints; it only calls sinks.

use crate::engine::{LogLevel, LogSink, ProgressSink};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗, on stderr)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for runs
///
/// Write errors (a closed pipe, say) are ignored so output can never fail a run.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use yearsort::output::OutputFormatter;
    /// OutputFormatter::success("Moved file: photo.jpg → 2021/photo.jpg");
    /// ```
    pub fn success(message: &str) {
        let _ = writeln!(io::stdout(), "{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        let _ = writeln!(io::stderr(), "{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    ///
    /// With `to_stderr` the line goes to stderr, keeping stdout clean for
    /// machine-readable output.
    pub fn warning_to(message: &str, to_stderr: bool) {
        let line = format!("{} {}", "⚠".yellow(), message);
        if to_stderr {
            let _ = writeln!(io::stderr(), "{}", line);
        } else {
            let _ = writeln!(io::stdout(), "{}", line);
        }
    }

    pub fn warning(message: &str) {
        Self::warning_to(message, false);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        let _ = writeln!(io::stdout(), "{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        let _ = writeln!(io::stdout(), "{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        let _ = writeln!(io::stdout(), "\n{}", header.bold());
    }

    /// Creates and returns a progress bar for a run over `total` items.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use yearsort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints one engine log event with the style of its level.
    pub fn log_event(message: &str, level: LogLevel) {
        match level {
            LogLevel::Info => Self::info(message),
            LogLevel::Success => Self::success(message),
            LogLevel::Warning => Self::warning(message),
            LogLevel::Error => Self::error(message),
        }
    }
}

/// Log sink that renders engine events on the terminal.
///
/// Lines are printed around the progress bar, when there is one, so the bar
/// is redrawn below them instead of being torn.
pub struct ConsoleLog {
    bar: Option<ProgressBar>,
    problems_only: bool,
}

impl ConsoleLog {
    pub fn new() -> Self {
        Self {
            bar: None,
            problems_only: false,
        }
    }

    /// Prints around `bar`.
    pub fn with_progress_bar(mut self, bar: ProgressBar) -> Self {
        self.bar = Some(bar);
        self
    }

    /// Drops info and success events and sends warnings to stderr.
    pub fn problems_only(mut self, problems_only: bool) -> Self {
        self.problems_only = problems_only;
        self
    }

    fn render(&self, message: &str, level: LogLevel) {
        if !self.problems_only {
            OutputFormatter::log_event(message, level);
            return;
        }
        match level {
            LogLevel::Warning => OutputFormatter::warning_to(message, true),
            LogLevel::Error => OutputFormatter::error(message),
            LogLevel::Info | LogLevel::Success => {}
        }
    }
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for ConsoleLog {
    fn log(&self, message: &str, level: LogLevel) {
        match &self.bar {
            Some(bar) => bar.suspend(|| self.render(message, level)),
            None => self.render(message, level),
        }
    }
}

/// Progress sink driving an `indicatif` bar.
pub struct BarProgress(ProgressBar);

impl BarProgress {
    pub fn new(bar: ProgressBar) -> Self {
        Self(bar)
    }
}

impl ProgressSink for BarProgress {
    fn progress(&self, current: usize, total: usize) {
        self.0.set_length(total as u64);
        self.0.set_position(current as u64);
    }
}
