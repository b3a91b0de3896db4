//! Duplicate resolution: what happens when a destination is already taken.
//!
//! Detection is by path collision only; contents are never compared.

use crate::config::DuplicateMode;
use crate::filter::Item;
use crate::year::{YearError, modified_local, rename_stamp};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

/// Why a colliding item is left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCause {
    /// The configured mode is `skip`.
    Policy,
    /// The configured mode is `interactive`, which this engine cannot prompt for.
    InteractiveUnsupported,
}

/// The decision taken for a colliding item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateDecision {
    /// Leave the item where it is.
    Skip(SkipCause),
    /// Move onto the existing destination, replacing it.
    Overwrite(PathBuf),
    /// Move to a fresh, non-colliding destination.
    Rename(PathBuf),
}

/// Decides what to do with `item`, whose computed `destination` already exists.
///
/// # Errors
///
/// In rename mode the item's modification time is needed for the new name;
/// failing to read it is returned as a `YearError`.
pub fn resolve(
    mode: DuplicateMode,
    item: &Item,
    destination: &Path,
) -> Result<DuplicateDecision, YearError> {
    match mode {
        DuplicateMode::Skip => Ok(DuplicateDecision::Skip(SkipCause::Policy)),
        DuplicateMode::Overwrite => Ok(DuplicateDecision::Overwrite(destination.to_path_buf())),
        DuplicateMode::Rename => {
            let stamp = rename_stamp(&modified_local(&item.path)?);
            Ok(DuplicateDecision::Rename(unique_destination(
                destination,
                &stamp,
                item.is_dir,
            )))
        }
        // No prompt can be shown from a non-blocking run; degrade to skip
        // rather than to any mode that touches the filesystem.
        DuplicateMode::Interactive => Ok(DuplicateDecision::Skip(
            SkipCause::InteractiveUnsupported,
        )),
    }
}

/// Finds the first free name of the form `<stem>_<stamp><.ext>`, then
/// `<stem>_<stamp>_<n><.ext>` for `n = 1, 2, ...`.
///
/// Directories keep their full name as the stem.
pub fn unique_destination(destination: &Path, stamp: &str, is_dir: bool) -> PathBuf {
    let parent = destination.parent().unwrap_or_else(|| Path::new(""));
    let (stem, suffix) = split_name(destination, is_dir);

    let mut candidate = parent.join(candidate_name(&stem, &format!("_{}", stamp), &suffix));
    let mut counter = 1u32;
    while path_taken(&candidate) {
        candidate = parent.join(candidate_name(
            &stem,
            &format!("_{}_{}", stamp, counter),
            &suffix,
        ));
        counter += 1;
    }
    candidate
}

/// Whether anything, including a dangling symlink, occupies `path`.
pub fn path_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Splits a file name into stem and dotted extension, keeping the on-disk bytes.
fn split_name(path: &Path, is_dir: bool) -> (OsString, OsString) {
    let name = path.file_name().map(OsStr::to_os_string).unwrap_or_default();
    if is_dir {
        return (name, OsString::new());
    }
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            let mut suffix = OsString::from(".");
            suffix.push(ext);
            (stem.to_os_string(), suffix)
        }
        _ => (name, OsString::new()),
    }
}

fn candidate_name(stem: &OsStr, tag: &str, suffix: &OsStr) -> OsString {
    let mut name = stem.to_os_string();
    name.push(tag);
    name.push(suffix);
    name
}
