//! Year resolution from modification timestamps.
//!
//! Items are classified by the calendar year of their last-modified time in
//! the local timezone. Modification time is used rather than creation time
//! because it is available on every platform.

use chrono::{DateTime, Datelike, Local};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Earliest year accepted as a plausible modification date.
pub const MIN_YEAR: i32 = 1900;
/// Latest year accepted as a plausible modification date.
pub const MAX_YEAR: i32 = 2100;

/// Why an item's year could not be determined.
#[derive(Debug, Error)]
pub enum YearError {
    /// The item's metadata or modification time could not be read.
    #[error("could not read modification time of {}: {}", .path.display(), .source)]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The modification time resolved to an implausible year.
    #[error("modification year {} is outside {}-{}", .year, MIN_YEAR, MAX_YEAR)]
    OutOfRange { year: i32 },
}

/// Returns the last-modified time of `path` in local time.
pub fn modified_local(path: &Path) -> Result<DateTime<Local>, YearError> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| YearError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(DateTime::<Local>::from(modified))
}

/// Returns the calendar year of the item's last-modified time.
///
/// # Errors
///
/// Returns `YearError::Unreadable` if the item cannot be stat'ed and
/// `YearError::OutOfRange` if the year falls outside `MIN_YEAR..=MAX_YEAR`.
pub fn item_year(path: &Path) -> Result<i32, YearError> {
    let year = modified_local(path)?.year();
    if is_plausible(year) {
        Ok(year)
    } else {
        Err(YearError::OutOfRange { year })
    }
}

/// Whether `year` lies within the accepted range.
pub fn is_plausible(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

/// Formats a timestamp the way renamed duplicates are suffixed: `YYYYMMDD_HHMMSS`.
pub fn rename_stamp(time: &DateTime<Local>) -> String {
    time.format("%Y%m%d_%H%M%S").to_string()
}
