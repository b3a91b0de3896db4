//! yearsort - sort a directory's files and folders into year folders
//!
//! This library moves every top-level item of a source directory into
//! `<target>/<year>/<name>`, where the year comes from the item's
//! last-modified time. It supports dry runs, folder and file-type filters,
//! a year filter, several duplicate policies, and cooperative cancellation.
//! Log and progress output go through injected sinks.

pub mod cli;
pub mod config;
pub mod duplicate;
pub mod engine;
pub mod file_organizer;
pub mod filter;
pub mod output;
pub mod year;

pub use config::{ConfigError, ConfigFile, DuplicateMode, OrganizerConfig, OrganizerConfigBuilder};
pub use engine::{CancelHandle, ItemOutcome, LogLevel, LogSink, Organizer, ProgressSink, RunStats};
pub use file_organizer::{FileOrganizer, OrganizeError};
pub use filter::{ExcludeReason, FilterDecision, Item, ItemFilter};

pub use cli::{Cli, run_cli};
