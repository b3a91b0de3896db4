//! Run configuration and configuration-file loading.
//!
//! An [`OrganizerConfig`] is immutable once built and describes exactly one
//! organizing run: where items come from, where the year folders go, and
//! which items participate. It is assembled through [`OrganizerConfigBuilder`],
//! optionally seeded from a TOML file:
//!
//! ```toml
//! [organize]
//! target = "/archive"
//! dry_run = true
//! files_only = false
//! verbose = false
//! duplicate_mode = "rename"
//! include_folders = []
//! exclude_folders = ["keep"]
//! target_year = 2021
//! file_types = ["jpg", "png"]
//! reserved_names = ["*.sh"]
//! ```

use crate::year::{MAX_YEAR, MIN_YEAR, is_plausible};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Names of the companion tooling that must never be organized away,
/// whatever the filters say. Configured reserved names are added to these.
pub const DEFAULT_RESERVED_NAMES: &[&str] = &[
    "org_docs.sh",
    "org_docs_gui.py",
    "file_organizer.py",
    LOCAL_CONFIG_FILE,
    "*.yearsort-partial",
    "*.yearsort-replaced",
];

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".yearsortrc.toml";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    Io(#[from] std::io::Error),
    /// A reserved-name pattern is not a valid glob.
    #[error("Invalid reserved name pattern '{pattern}': {reason}")]
    InvalidReservedPattern { pattern: String, reason: String },
    /// The year filter lies outside the resolvable range.
    #[error("Target year {} is outside {}-{}", .0, MIN_YEAR, MAX_YEAR)]
    YearOutOfRange(i32),
    /// An unknown duplicate mode name.
    #[error("Unknown duplicate mode '{0}' (expected interactive, skip, rename or overwrite)")]
    UnknownDuplicateMode(String),
}

/// What to do when an item's destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateMode {
    /// Ask per item. Not available in the non-blocking engine, which skips instead.
    Interactive,
    /// Leave the item where it is.
    Skip,
    /// Move the item under a timestamped name.
    #[default]
    Rename,
    /// Replace the existing destination.
    Overwrite,
}

impl fmt::Display for DuplicateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Interactive => "interactive",
            Self::Skip => "skip",
            Self::Rename => "rename",
            Self::Overwrite => "overwrite",
        };
        f.write_str(name)
    }
}

impl FromStr for DuplicateMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interactive" => Ok(Self::Interactive),
            "skip" => Ok(Self::Skip),
            "rename" => Ok(Self::Rename),
            "overwrite" => Ok(Self::Overwrite),
            _ => Err(ConfigError::UnknownDuplicateMode(s.to_string())),
        }
    }
}

/// Immutable configuration for one organizing run.
#[derive(Debug, Clone)]
pub struct OrganizerConfig {
    source_dir: PathBuf,
    target_dir: PathBuf,
    dry_run: bool,
    files_only: bool,
    verbose: bool,
    duplicate_mode: DuplicateMode,
    included_folders: Option<HashSet<String>>,
    excluded_folders: Option<HashSet<String>>,
    target_year: Option<i32>,
    file_types: Option<HashSet<String>>,
    reserved_names: Vec<Pattern>,
}

impl OrganizerConfig {
    /// Starts a configuration for organizing `source_dir`.
    pub fn builder(source_dir: impl Into<PathBuf>) -> OrganizerConfigBuilder {
        OrganizerConfigBuilder::new(source_dir)
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Where year folders are created. Equals the source when no target was given.
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn files_only(&self) -> bool {
        self.files_only
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn duplicate_mode(&self) -> DuplicateMode {
        self.duplicate_mode
    }

    /// Directory allow-list. When present the deny-list is ignored.
    pub fn included_folders(&self) -> Option<&HashSet<String>> {
        self.included_folders.as_ref()
    }

    pub fn excluded_folders(&self) -> Option<&HashSet<String>> {
        self.excluded_folders.as_ref()
    }

    pub fn target_year(&self) -> Option<i32> {
        self.target_year
    }

    /// Allowed file extensions, without the leading dot. Never applied to directories.
    pub fn file_types(&self) -> Option<&HashSet<String>> {
        self.file_types.as_ref()
    }

    /// Whether `name` matches one of the reserved tool names.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved_names
            .iter()
            .any(|pattern| pattern.matches(name))
    }
}

/// Step-by-step construction of an [`OrganizerConfig`].
#[derive(Debug, Clone)]
pub struct OrganizerConfigBuilder {
    source_dir: PathBuf,
    target_dir: Option<PathBuf>,
    dry_run: bool,
    files_only: bool,
    verbose: bool,
    duplicate_mode: DuplicateMode,
    included_folders: Vec<String>,
    excluded_folders: Vec<String>,
    target_year: Option<i32>,
    file_types: Vec<String>,
    reserved_names: Vec<String>,
}

impl OrganizerConfigBuilder {
    fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: None,
            dry_run: true,
            files_only: false,
            verbose: false,
            duplicate_mode: DuplicateMode::default(),
            included_folders: Vec::new(),
            excluded_folders: Vec::new(),
            target_year: None,
            file_types: Vec::new(),
            reserved_names: Vec::new(),
        }
    }

    pub fn target_dir(mut self, target_dir: impl Into<PathBuf>) -> Self {
        self.target_dir = Some(target_dir.into());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn files_only(mut self, files_only: bool) -> Self {
        self.files_only = files_only;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn duplicate_mode(mut self, mode: DuplicateMode) -> Self {
        self.duplicate_mode = mode;
        self
    }

    pub fn include_folders<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included_folders = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude_folders<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_folders = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn target_year(mut self, year: Option<i32>) -> Self {
        self.target_year = year;
        self
    }

    /// Restricts files to these extensions. A leading dot is tolerated and stripped.
    pub fn file_types<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_types = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Adds glob patterns for names that are never organized.
    pub fn reserve_names<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_names
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a reserved-name pattern is not a valid glob or the
    /// year filter is outside the resolvable range.
    pub fn build(self) -> Result<OrganizerConfig, ConfigError> {
        if let Some(year) = self.target_year
            && !is_plausible(year)
        {
            return Err(ConfigError::YearOutOfRange(year));
        }

        let reserved_names = DEFAULT_RESERVED_NAMES
            .iter()
            .map(|name| name.to_string())
            .chain(self.reserved_names)
            .map(|pattern| {
                Pattern::new(&pattern).map_err(|e| ConfigError::InvalidReservedPattern {
                    reason: e.msg.to_string(),
                    pattern,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let target_dir = self
            .target_dir
            .unwrap_or_else(|| self.source_dir.clone());

        Ok(OrganizerConfig {
            source_dir: self.source_dir,
            target_dir,
            dry_run: self.dry_run,
            files_only: self.files_only,
            verbose: self.verbose,
            duplicate_mode: self.duplicate_mode,
            included_folders: non_empty(self.included_folders),
            excluded_folders: non_empty(self.excluded_folders),
            target_year: self.target_year,
            file_types: non_empty(self.file_types),
            reserved_names,
        })
    }
}

/// An empty list means "not configured".
fn non_empty(values: Vec<String>) -> Option<HashSet<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.into_iter().collect())
    }
}

/// Contents of a configuration file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub organize: OrganizeSection,
}

/// The `[organize]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizeSection {
    pub target: Option<PathBuf>,
    pub dry_run: Option<bool>,
    pub files_only: Option<bool>,
    pub verbose: Option<bool>,
    pub duplicate_mode: Option<DuplicateMode>,
    pub include_folders: Option<Vec<String>>,
    pub exclude_folders: Option<Vec<String>>,
    pub target_year: Option<i32>,
    pub file_types: Option<Vec<String>>,
    pub reserved_names: Option<Vec<String>>,
}

impl ConfigFile {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.yearsortrc.toml` in the current directory
    /// 3. Look for `~/.config/yearsort/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly provided file is missing, or any
    /// discovered file cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("yearsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Seeds a builder for `source_dir` with the values present in this file.
    pub fn builder_for(&self, source_dir: impl Into<PathBuf>) -> OrganizerConfigBuilder {
        let section = &self.organize;
        let mut builder = OrganizerConfig::builder(source_dir);

        if let Some(target) = &section.target {
            builder = builder.target_dir(target);
        }
        if let Some(dry_run) = section.dry_run {
            builder = builder.dry_run(dry_run);
        }
        if let Some(files_only) = section.files_only {
            builder = builder.files_only(files_only);
        }
        if let Some(verbose) = section.verbose {
            builder = builder.verbose(verbose);
        }
        if let Some(mode) = section.duplicate_mode {
            builder = builder.duplicate_mode(mode);
        }
        if let Some(names) = &section.include_folders {
            builder = builder.include_folders(names.iter().cloned());
        }
        if let Some(names) = &section.exclude_folders {
            builder = builder.exclude_folders(names.iter().cloned());
        }
        if let Some(extensions) = &section.file_types {
            builder = builder.file_types(extensions.iter().cloned());
        }
        if let Some(patterns) = &section.reserved_names {
            builder = builder.reserve_names(patterns.iter().cloned());
        }
        builder.target_year(section.target_year)
    }
}
