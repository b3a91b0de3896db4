//! Discovery model and participation rules.
//!
//! Only direct children of the source directory are considered. Each one is
//! run through [`ItemFilter::evaluate`], whose rules are checked in this order,
//! with early termination:
//! 1. Reserved tool names - always excluded
//! 2. The target directory itself, and existing year folders when the target
//!    is the source - excluded
//! 3. Directories in files-only mode - excluded
//! 4. Directory allow-list - if configured, decides alone for directories
//! 5. Directory deny-list - excluded if listed
//! 6. File extension set - files with other extensions excluded
//! 7. Target year - items from other (or unknown) years excluded

use crate::config::OrganizerConfig;
use crate::year::{YearError, is_plausible};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};

/// A direct child of the source directory considered for relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// The entry's file name exactly as stored on disk.
    pub file_name: OsString,
    /// The file name as text, for logs and name matching. Lossy when the
    /// on-disk name is not valid UTF-8.
    pub name: String,
    /// The full path to the entry.
    pub path: PathBuf,
    /// Whether the entry is (or links to) a directory.
    pub is_dir: bool,
}

impl Item {
    pub fn new(path: PathBuf, is_dir: bool) -> Self {
        let file_name = path.file_name().map(OsStr::to_os_string).unwrap_or_default();
        let name = file_name.to_string_lossy().to_string();
        Self {
            file_name,
            name,
            path,
            is_dir,
        }
    }

    pub fn from_path(path: PathBuf) -> Self {
        let is_dir = path.is_dir();
        Self::new(path, is_dir)
    }

    fn from_entry(entry: &DirEntry) -> Self {
        Self::from_path(entry.path())
    }

    /// "file" or "directory", for log messages.
    pub fn kind(&self) -> &'static str {
        if self.is_dir { "directory" } else { "file" }
    }

    /// The extension without its dot, or an empty string when there is none.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Lists the direct children of `source_dir`, sorted by name.
///
/// # Errors
///
/// Fails if the directory cannot be opened or any entry cannot be read.
pub fn discover(source_dir: &Path) -> io::Result<Vec<Item>> {
    let entries = fs::read_dir(source_dir)?.collect::<io::Result<Vec<_>>>()?;
    let mut items: Vec<Item> = entries.iter().map(Item::from_entry).collect();
    items.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(items)
}

/// Why an item was left out of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcludeReason {
    Reserved,
    TargetDirectory,
    YearFolder,
    DirectoriesDisabled,
    NotInAllowList,
    InDenyList,
    ExtensionNotAllowed(String),
    YearMismatch(i32),
    YearUnresolved,
}

impl fmt::Display for ExcludeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved => write!(f, "reserved tool file"),
            Self::TargetDirectory => write!(f, "target directory"),
            Self::YearFolder => write!(f, "existing year folder"),
            Self::DirectoriesDisabled => write!(f, "files-only mode"),
            Self::NotInAllowList => write!(f, "not in included folders"),
            Self::InDenyList => write!(f, "in excluded folders"),
            Self::ExtensionNotAllowed(ext) if ext.is_empty() => {
                write!(f, "no extension, file type filter active")
            }
            Self::ExtensionNotAllowed(ext) => write!(f, "file type '{}' not selected", ext),
            Self::YearMismatch(year) => write!(f, "from {}", year),
            Self::YearUnresolved => write!(f, "year unknown"),
        }
    }
}

/// Outcome of running an item through the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Keep,
    Exclude(ExcludeReason),
}

/// Applies a configuration's participation rules to discovered items.
pub struct ItemFilter<'a> {
    config: &'a OrganizerConfig,
}

impl<'a> ItemFilter<'a> {
    pub fn new(config: &'a OrganizerConfig) -> Self {
        Self { config }
    }

    /// Decides whether `item` takes part in the run.
    ///
    /// `year_of` is only called when a target-year filter is configured, so
    /// items are never stat'ed for the filter otherwise.
    pub fn evaluate<F>(&self, item: &Item, year_of: F) -> FilterDecision
    where
        F: FnOnce(&Item) -> Result<i32, YearError>,
    {
        if self.config.is_reserved(&item.name) {
            return FilterDecision::Exclude(ExcludeReason::Reserved);
        }

        if item.is_dir {
            if item.path == self.config.target_dir() {
                return FilterDecision::Exclude(ExcludeReason::TargetDirectory);
            }

            if self.config.target_dir() == self.config.source_dir() && is_year_folder(&item.name) {
                return FilterDecision::Exclude(ExcludeReason::YearFolder);
            }

            if self.config.files_only() {
                return FilterDecision::Exclude(ExcludeReason::DirectoriesDisabled);
            }

            if let Some(included) = self.config.included_folders() {
                if !included.contains(&item.name) {
                    return FilterDecision::Exclude(ExcludeReason::NotInAllowList);
                }
            } else if let Some(excluded) = self.config.excluded_folders()
                && excluded.contains(&item.name)
            {
                return FilterDecision::Exclude(ExcludeReason::InDenyList);
            }
        } else if let Some(types) = self.config.file_types() {
            let ext = item.extension();
            if !types.contains(&ext) {
                return FilterDecision::Exclude(ExcludeReason::ExtensionNotAllowed(ext));
            }
        }

        if let Some(target_year) = self.config.target_year() {
            return match year_of(item) {
                Ok(year) if year == target_year => FilterDecision::Keep,
                Ok(year) => FilterDecision::Exclude(ExcludeReason::YearMismatch(year)),
                Err(_) => FilterDecision::Exclude(ExcludeReason::YearUnresolved),
            };
        }

        FilterDecision::Keep
    }
}

/// A four-digit name within the resolvable year range, as produced by a previous run.
fn is_year_folder(name: &str) -> bool {
    name.len() == 4
        && name.bytes().all(|b| b.is_ascii_digit())
        && name.parse().is_ok_and(is_plausible)
}
