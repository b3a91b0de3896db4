//! The organizing engine.
//!
//! [`Organizer::organize`] runs the whole pipeline for one configuration:
//! enumerate the source directory, filter, then for each kept item resolve
//! its year and destination, settle any collision, and move (or simulate the
//! move). Everything the run decides is reported through the injected
//! [`LogSink`] and [`ProgressSink`]; the returned [`RunStats`] is the only
//! other result.
//!
//! A run is single-threaded. The engine itself is `Send + Sync`, so callers
//! may drive it from a worker thread and cancel it from another through a
//! [`CancelHandle`]. Cancellation is checked between items only; a move in
//! flight always completes.

use crate::config::OrganizerConfig;
use crate::duplicate::{self, DuplicateDecision, SkipCause, path_taken};
use crate::file_organizer::{FileOrganizer, OrganizeError};
use crate::filter::{FilterDecision, Item, ItemFilter, discover};
use crate::output::OutputFormatter;
use crate::year::{YearError, item_year};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// Receives log events from a run.
///
/// Called synchronously from the thread running the pipeline. A sink has no
/// way to fail the run; it must deal with its own output errors.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str, level: LogLevel);
}

impl<F> LogSink for F
where
    F: Fn(&str, LogLevel) + Send + Sync,
{
    fn log(&self, message: &str, level: LogLevel) {
        self(message, level)
    }
}

/// Receives `(current, total)` once per processed item. Advisory only.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, current: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn progress(&self, current: usize, total: usize) {
        self(current, total)
    }
}

/// Prints `[LEVEL] message` lines.
fn default_log(message: &str, level: LogLevel) {
    OutputFormatter::plain(&format!("[{}] {}", level, message));
}

fn no_progress(_current: usize, _total: usize) {}

/// Shared cancellation flag for a running organize.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Requests the run to stop before its next item.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Counters describing one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Files moved into a year directory.
    pub files_moved: usize,
    /// Items given a timestamped name because their destination was taken.
    pub files_renamed: usize,
    /// Items filtered out, without a usable year, or skipped as duplicates.
    pub files_skipped: usize,
    /// Directories moved into a year directory.
    pub dirs_moved: usize,
    /// Items that failed, plus an unreadable source directory.
    pub errors: usize,
}

impl RunStats {
    pub fn total_moved(&self) -> usize {
        self.files_moved + self.dirs_moved
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// What happened to a single kept item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Moved,
    /// Dry run: the move was decided and logged but not performed.
    Simulated,
    Skipped,
    Failed,
}

/// Failure while processing one item. Never ends the run.
#[derive(Debug, Error)]
enum ItemError {
    #[error(transparent)]
    Year(#[from] YearError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
}

/// Relocates the top-level items of a directory into year folders.
pub struct Organizer {
    config: OrganizerConfig,
    log_sink: Box<dyn LogSink>,
    progress_sink: Box<dyn ProgressSink>,
    cancel: CancelHandle,
}

impl Organizer {
    /// Creates an engine that logs to stdout and reports no progress.
    pub fn new(config: OrganizerConfig) -> Self {
        Self {
            config,
            log_sink: Box::new(default_log),
            progress_sink: Box::new(no_progress),
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_log_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.log_sink = Box::new(sink);
        self
    }

    pub fn with_progress_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress_sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    /// A handle that can stop the current run from any thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Stops the current run before its next item.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.log("Operation cancelled by user", LogLevel::Warning);
    }

    fn log(&self, message: &str, level: LogLevel) {
        self.log_sink.log(message, level);
    }

    /// Runs the pipeline once and returns its statistics.
    ///
    /// Statistics and the cancellation flag start fresh on every call. Only
    /// an unreadable source directory ends the run early; every per-item
    /// failure is logged, counted and followed by the next item.
    pub fn organize(&self) -> RunStats {
        self.cancel.reset();
        let mut stats = RunStats::default();
        let config = &self.config;

        self.log("Starting file organization...", LogLevel::Info);
        self.log(
            &format!("Source: {}", config.source_dir().display()),
            LogLevel::Info,
        );
        self.log(
            &format!("Target: {}", config.target_dir().display()),
            LogLevel::Info,
        );
        if config.dry_run() {
            self.log("DRY RUN MODE - No changes will be made", LogLevel::Warning);
        }

        let discovered = match discover(config.source_dir()) {
            Ok(items) => items,
            Err(e) => {
                self.log(
                    &format!("Error reading source directory: {}", e),
                    LogLevel::Error,
                );
                stats.errors += 1;
                return stats;
            }
        };

        let kept = self.select(discovered, &mut stats);

        if !self.cancel.is_cancelled() {
            let total = kept.len();
            self.log(&format!("Processing {} items...", total), LogLevel::Info);

            for (idx, item) in kept.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    break;
                }

                let current = idx + 1;
                self.progress_sink.progress(current, total);

                if config.verbose() || !config.dry_run() {
                    self.log(
                        &format!(
                            "[{}/{}] Processing {}: {}",
                            current,
                            total,
                            item.kind(),
                            item.name
                        ),
                        LogLevel::Info,
                    );
                }

                self.move_item(item, &mut stats);
            }
        }

        if self.cancel.is_cancelled() {
            self.log("Operation cancelled", LogLevel::Warning);
        }

        self.summarize(&stats);
        stats
    }

    /// Applies the filter to every discovered item, keeping discovery order.
    fn select(&self, discovered: Vec<Item>, stats: &mut RunStats) -> Vec<Item> {
        let filter = ItemFilter::new(&self.config);
        let mut kept = Vec::new();

        for item in discovered {
            if self.cancel.is_cancelled() {
                break;
            }

            match filter.evaluate(&item, |item| self.resolve_year(item)) {
                FilterDecision::Keep => kept.push(item),
                FilterDecision::Exclude(reason) => {
                    stats.files_skipped += 1;
                    if self.config.verbose() {
                        self.log(
                            &format!("Skipping: {} ({})", item.name, reason),
                            LogLevel::Info,
                        );
                    }
                }
            }
        }

        kept
    }

    /// Resolves an item's year, warning when it cannot be determined.
    fn resolve_year(&self, item: &Item) -> Result<i32, YearError> {
        item_year(&item.path).inspect_err(|e| {
            self.log(
                &format!("Could not get year for {}: {}", item.name, e),
                LogLevel::Warning,
            );
        })
    }

    /// Moves, or in dry-run simulates moving, one kept item.
    pub fn move_item(&self, item: &Item, stats: &mut RunStats) -> ItemOutcome {
        match self.try_move_item(item, stats) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.log(
                    &format!("Error processing {}: {}", item.name, e),
                    LogLevel::Error,
                );
                stats.errors += 1;
                ItemOutcome::Failed
            }
        }
    }

    fn try_move_item(&self, item: &Item, stats: &mut RunStats) -> Result<ItemOutcome, ItemError> {
        let Ok(year) = self.resolve_year(item) else {
            self.log(
                &format!("Skipping {} (no date)", item.name),
                LogLevel::Warning,
            );
            stats.files_skipped += 1;
            return Ok(ItemOutcome::Skipped);
        };

        let target = self.config.target_dir();
        let mut destination = target.join(year.to_string()).join(&item.file_name);
        let mut replace = false;

        if path_taken(&destination) {
            self.log(&duplicate_notice(item, &destination), LogLevel::Warning);

            match duplicate::resolve(self.config.duplicate_mode(), item, &destination)? {
                DuplicateDecision::Skip(cause) => {
                    let message = match cause {
                        SkipCause::Policy => format!("Skipping duplicate {}", item.kind()),
                        SkipCause::InteractiveUnsupported => format!(
                            "Skipping duplicate {} (interactive not supported)",
                            item.kind()
                        ),
                    };
                    self.log(&message, LogLevel::Warning);
                    stats.files_skipped += 1;
                    return Ok(ItemOutcome::Skipped);
                }
                DuplicateDecision::Overwrite(path) => {
                    self.log(
                        &format!("Overwriting existing {}", item.kind()),
                        LogLevel::Warning,
                    );
                    destination = path;
                    replace = true;
                }
                DuplicateDecision::Rename(path) => {
                    let new_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    self.log(&format!("Renaming to: {}", new_name), LogLevel::Info);
                    stats.files_renamed += 1;
                    destination = path;
                }
            }
        }

        let shown = destination
            .strip_prefix(target)
            .unwrap_or(&destination)
            .display()
            .to_string();

        if self.config.dry_run() {
            self.log(
                &format!(
                    "[DRY-RUN] Would move {}: {} → {}",
                    item.kind(),
                    item.name,
                    shown
                ),
                LogLevel::Info,
            );
            return Ok(ItemOutcome::Simulated);
        }

        FileOrganizer::relocate(&item.path, &destination, replace)?;
        self.log(
            &format!("Moved {}: {} → {}", item.kind(), item.name, shown),
            LogLevel::Success,
        );

        if item.is_dir {
            stats.dirs_moved += 1;
        } else {
            stats.files_moved += 1;
        }
        Ok(ItemOutcome::Moved)
    }

    fn summarize(&self, stats: &RunStats) {
        let rule = "=".repeat(60);
        self.log(&rule, LogLevel::Info);
        self.log("Summary:", LogLevel::Info);
        self.log(&rule, LogLevel::Info);

        let lines = [
            ("Files moved", stats.files_moved, LogLevel::Success),
            ("Directories moved", stats.dirs_moved, LogLevel::Success),
            ("Files renamed", stats.files_renamed, LogLevel::Warning),
            ("Files skipped", stats.files_skipped, LogLevel::Warning),
            ("Errors", stats.errors, LogLevel::Error),
        ];
        for (label, count, level) in lines {
            if count > 0 {
                self.log(&format!("{}: {}", label, count), level);
            }
        }

        self.log(&rule, LogLevel::Info);

        if self.config.dry_run() {
            self.log(
                "This was a dry run. No changes were made.",
                LogLevel::Warning,
            );
        }
    }
}

/// "Duplicate file: name (Source: N bytes, Existing: M bytes)"; sizes only for files.
fn duplicate_notice(item: &Item, destination: &std::path::Path) -> String {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let sizes = if item.is_dir {
        None
    } else {
        fs::metadata(&item.path)
            .and_then(|src| Ok((src.len(), fs::metadata(destination)?.len())))
            .ok()
    };

    match sizes {
        Some((source, existing)) => format!(
            "Duplicate {}: {} (Source: {} bytes, Existing: {} bytes)",
            item.kind(),
            name,
            source,
            existing
        ),
        None => format!("Duplicate {}: {}", item.kind(), name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn capture() -> (Arc<Mutex<Vec<(String, LogLevel)>>>, impl LogSink + 'static) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let sink = move |message: &str, level: LogLevel| {
            sink_events
                .lock()
                .unwrap()
                .push((message.to_string(), level));
        };
        (events, sink)
    }

    #[test]
    fn test_missing_source_counts_one_error() {
        let config = OrganizerConfig::builder("/non/existent/source")
            .build()
            .unwrap();
        let (events, sink) = capture();
        let organizer = Organizer::new(config).with_log_sink(sink);

        let stats = organizer.organize();

        assert_eq!(
            stats,
            RunStats {
                errors: 1,
                ..Default::default()
            }
        );
        let events = events.lock().unwrap();
        assert!(events.iter().any(|(message, level)| {
            *level == LogLevel::Error && message.starts_with("Error reading source directory")
        }));
        assert!(!events.iter().any(|(message, _)| message == "Summary:"));
    }

    #[test]
    fn test_summary_lists_only_nonzero_counters() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join("a.txt"), "a").unwrap();

        let config = OrganizerConfig::builder(temp_dir.path())
            .dry_run(false)
            .build()
            .unwrap();
        let (events, sink) = capture();
        let stats = Organizer::new(config).with_log_sink(sink).organize();

        assert_eq!(stats.files_moved, 1);
        let events = events.lock().unwrap();
        assert!(events.iter().any(|(m, l)| m == "Files moved: 1" && *l == LogLevel::Success));
        assert!(!events.iter().any(|(m, _)| m.starts_with("Errors")));
        assert!(!events.iter().any(|(m, _)| m.starts_with("Files skipped")));
        assert!(!events.iter().any(|(m, _)| m.starts_with("This was a dry run")));
    }

    #[test]
    fn test_move_item_without_date_is_skipped() {
        let config = OrganizerConfig::builder("/tmp").dry_run(false).build().unwrap();
        let (_events, sink) = capture();
        let organizer = Organizer::new(config).with_log_sink(sink);
        let mut stats = RunStats::default();

        let item = Item::new(PathBuf::from("/non/existent/ghost.txt"), false);
        let outcome = organizer.move_item(&item, &mut stats);

        assert_eq!(outcome, ItemOutcome::Skipped);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn test_cancel_handle_is_shared() {
        let config = OrganizerConfig::builder("/tmp").build().unwrap();
        let (events, sink) = capture();
        let organizer = Organizer::new(config).with_log_sink(sink);
        let handle = organizer.cancel_handle();

        organizer.cancel();
        assert!(handle.is_cancelled());
        assert!(
            events
                .lock()
                .unwrap()
                .iter()
                .any(|(m, _)| m == "Operation cancelled by user")
        );
    }

    #[test]
    fn test_organizer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Organizer>();
        assert_send_sync::<CancelHandle>();
    }

    #[test]
    fn test_log_level_labels() {
        assert_eq!(LogLevel::Info.to_string(), "INFO");
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
    }
}
