//! Physical relocation of items into their year directories.
//!
//! Moves are a single `rename` whenever source and destination share a
//! filesystem. Across devices the item is copied into a hidden staging entry
//! next to the destination, renamed into place, and only then is the source
//! removed, so a destination is never left half-written.
//!
//! An entry being overwritten is first set aside under a hidden name and is
//! only deleted once the new item is in place. If the move fails it is put
//! back.

use filetime::FileTime;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Suffix of the staging entry used by cross-device moves.
pub const STAGING_SUFFIX: &str = ".yearsort-partial";

/// Suffix of an existing entry set aside while it is being overwritten.
pub const REPLACED_SUFFIX: &str = ".yearsort-replaced";

/// Errors that can occur while relocating an item.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Failed to create a year directory.
    #[error("Failed to create directory {}: {}", .path.display(), .source)]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The destination has no parent directory to create.
    #[error("Invalid destination {}", .0.display())]
    InvalidDestination(PathBuf),
    /// The existing destination could not be set aside for an overwrite.
    #[error("Failed to replace {}: {}", .path.display(), .source)]
    ReplaceFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Failed to move an item to its destination.
    #[error("Failed to move {} to {}: {}", .from.display(), .to.display(), .error)]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },
    /// Copying across devices failed; the source is untouched.
    #[error("Failed to copy {} to {}: {}", .from.display(), .to.display(), .error)]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },
    /// The item was copied to its destination but the original could not be removed.
    #[error("Copied to {} but could not remove original {}: {}", .to.display(), .from.display(), .error)]
    SourceRemovalFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },
}

/// Result type for relocation operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves items into year directories.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Moves `source` to `destination`, creating the destination's parent
    /// directories as needed.
    ///
    /// With `replace` set, an existing destination is replaced. It is renamed
    /// out of the way first and removed only after the move succeeds; a
    /// failed move restores it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use yearsort::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let result = FileOrganizer::relocate(
    ///     Path::new("/path/to/inbox/photo.jpg"),
    ///     Path::new("/path/to/inbox/2021/photo.jpg"),
    ///     false,
    /// );
    ///
    /// match result {
    ///     Ok(()) => println!("File organized successfully"),
    ///     Err(e) => eprintln!("Organization failed: {}", e),
    /// }
    /// ```
    pub fn relocate(source: &Path, destination: &Path, replace: bool) -> OrganizeResult<()> {
        let parent = destination
            .parent()
            .ok_or_else(|| OrganizeError::InvalidDestination(destination.to_path_buf()))?;

        fs::create_dir_all(parent).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;

        let displaced = if replace {
            Self::set_aside(destination)?
        } else {
            None
        };

        let result = Self::move_entry(source, destination);

        if let Some(aside) = displaced {
            match &result {
                // The new item is in place either way.
                Ok(()) | Err(OrganizeError::SourceRemovalFailed { .. }) => {
                    Self::remove_entry(&aside).ok();
                }
                Err(_) => {
                    fs::rename(&aside, destination).ok();
                }
            }
        }

        result
    }

    fn move_entry(source: &Path, destination: &Path) -> OrganizeResult<()> {
        match fs::rename(source, destination) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                Self::copy_then_remove(source, destination)
            }
            Err(e) => Err(OrganizeError::MoveFailed {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                error: e,
            }),
        }
    }

    /// Renames an existing destination to `.<name>.yearsort-replaced`.
    fn set_aside(destination: &Path) -> OrganizeResult<Option<PathBuf>> {
        if fs::symlink_metadata(destination).is_err() {
            return Ok(None);
        }

        let aside = Self::hidden_sibling(destination, REPLACED_SUFFIX);
        Self::remove_entry(&aside).ok();
        fs::rename(destination, &aside).map_err(|e| OrganizeError::ReplaceFailed {
            path: destination.to_path_buf(),
            source: e,
        })?;
        Ok(Some(aside))
    }

    fn copy_then_remove(source: &Path, destination: &Path) -> OrganizeResult<()> {
        let staging = Self::hidden_sibling(destination, STAGING_SUFFIX);
        Self::remove_entry(&staging).ok();

        if let Err(e) = copy_tree(source, &staging) {
            Self::remove_entry(&staging).ok();
            return Err(OrganizeError::CopyFailed {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                error: e,
            });
        }

        if let Err(e) = fs::rename(&staging, destination) {
            Self::remove_entry(&staging).ok();
            return Err(OrganizeError::MoveFailed {
                from: staging,
                to: destination.to_path_buf(),
                error: e,
            });
        }

        Self::remove_entry(source).map_err(|e| OrganizeError::SourceRemovalFailed {
            from: source.to_path_buf(),
            to: destination.to_path_buf(),
            error: e,
        })
    }

    /// `.<name><suffix>` next to `destination`, keeping the name's bytes.
    fn hidden_sibling(destination: &Path, suffix: &str) -> PathBuf {
        let mut name = OsString::from(".");
        if let Some(file_name) = destination.file_name() {
            name.push(file_name);
        }
        name.push(suffix);
        destination.with_file_name(name)
    }

    fn remove_entry(path: &Path) -> io::Result<()> {
        let meta = fs::symlink_metadata(path)?;
        if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }
}

/// Copies a file, symlink or directory tree without following links.
///
/// Files and directories keep their modification times; symlinks are
/// recreated pointing at the same target.
fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    let mut directories = Vec::new();

    for entry in WalkDir::new(source).follow_links(false).follow_root_links(false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = if relative.as_os_str().is_empty() {
            destination.to_path_buf()
        } else {
            destination.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else if file_type.is_dir() {
            fs::create_dir(&target)?;
            let modified = FileTime::from_last_modification_time(&entry.metadata()?);
            directories.push((target, modified));
        } else {
            fs::copy(entry.path(), &target)?;
            let modified = FileTime::from_last_modification_time(&entry.metadata()?);
            filetime::set_file_mtime(&target, modified)?;
        }
    }

    // Children are written after their parent, so restore deepest first.
    for (directory, modified) in directories.into_iter().rev() {
        filetime::set_file_mtime(&directory, modified)?;
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, target)
}

#[cfg(windows)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    let points_to = fs::read_link(link)?;
    if link.is_dir() {
        symlink_dir(points_to, target)
    } else {
        symlink_file(points_to, target)
    }
}

#[cfg(not(any(unix, windows)))]
fn copy_symlink(link: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("cannot recreate symlink {}", link.display()),
    ))
}
