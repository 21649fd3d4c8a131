//! Remediation strategies for confirmed duplicates.
//!
//! This module provides:
//! - [`hardlink`]: replace the duplicate with a hard link to the representative
//! - [`delete`]: remove the duplicate
//! - [`rename`]: move the duplicate aside as `<name>.duplicate`
//!
//! All functions act on a single file and report failures as
//! [`ActionError`]; callers treat them as per-file errors.
//!
//! ```no_run
//! use rustdedup::actions::{apply, Strategy};
//! use std::path::Path;
//!
//! let result = apply(Strategy::Hardlink, Path::new("a.txt"), Path::new("b.txt"));
//! ```

pub mod delete;
pub mod hardlink;
pub mod rename;

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use delete::delete_duplicate;
pub use hardlink::replace_with_hardlink;
pub use rename::rename_duplicate;

/// Suffix of the temporary name used while replacing a file with a link.
pub const TEMP_SUFFIX: &str = ".rdd-tmp";

/// Suffix appended by the rename strategy.
pub const DUPLICATE_SUFFIX: &str = ".duplicate";

/// Action applied to a confirmed duplicate.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Replace the duplicate with a hard link to the representative
    #[default]
    Hardlink,
    /// Delete the duplicate
    Delete,
    /// Rename the duplicate to `<name>.duplicate`
    Rename,
}

impl Strategy {
    /// Whether the strategy reclaims the duplicate's space.
    #[must_use]
    pub const fn reclaims_space(self) -> bool {
        matches!(self, Self::Hardlink | Self::Delete)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardlink => write!(f, "hardlink"),
            Self::Delete => write!(f, "delete"),
            Self::Rename => write!(f, "rename"),
        }
    }
}

/// Error type for duplicate actions.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Hard links cannot span filesystems.
    #[error("cannot hardlink across devices: {duplicate} -> {original}")]
    CrossDevice {
        /// Representative file
        original: PathBuf,
        /// Duplicate that was left untouched
        duplicate: PathBuf,
    },

    /// The destination name is already taken.
    #[error("target already exists: {0}")]
    NameCollision(PathBuf),

    /// The file was moved aside and could not be put back.
    ///
    /// The content survives at `temp`, but `path` is missing.
    #[error("{path} is missing after a failed replacement; content kept at {temp}: {source}")]
    PartialReplace {
        /// Original location of the duplicate
        path: PathBuf,
        /// Where the content was left
        temp: PathBuf,
        /// Error that interrupted the replacement
        #[source]
        source: io::Error,
    },

    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when acting on the file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl ActionError {
    /// Classify an I/O error raised while acting on `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Whether the filesystem was left in a damaged state.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PartialReplace { .. })
    }
}

/// Apply `strategy` to `duplicate`, whose content equals `original`.
///
/// Returns the new location of the duplicate for [`Strategy::Rename`],
/// `None` otherwise.
///
/// # Errors
///
/// Returns [`ActionError`] if the action failed.
pub fn apply(
    strategy: Strategy,
    original: &Path,
    duplicate: &Path,
) -> Result<Option<PathBuf>, ActionError> {
    match strategy {
        Strategy::Hardlink => replace_with_hardlink(original, duplicate).map(|()| None),
        Strategy::Delete => delete_duplicate(duplicate).map(|()| None),
        Strategy::Rename => rename_duplicate(duplicate).map(Some),
    }
}

/// Check the preconditions of `strategy` without touching the filesystem.
///
/// Used by dry runs: returns what [`apply`] would return when nothing
/// changes between the check and the action.
///
/// # Errors
///
/// Returns the [`ActionError`] the real action would fail with up front
/// (cross-device link, name collision, unreadable paths).
pub fn simulate(
    strategy: Strategy,
    original: &Path,
    duplicate: &Path,
) -> Result<Option<PathBuf>, ActionError> {
    match strategy {
        Strategy::Hardlink => {
            let cross = crate::scanner::identity::on_different_devices(original, duplicate)
                .map_err(|e| ActionError::from_io(duplicate, e))?;
            if cross {
                return Err(ActionError::CrossDevice {
                    original: original.to_path_buf(),
                    duplicate: duplicate.to_path_buf(),
                });
            }
            Ok(None)
        }
        Strategy::Delete => std::fs::symlink_metadata(duplicate)
            .map(|_| None)
            .map_err(|e| ActionError::from_io(duplicate, e)),
        Strategy::Rename => {
            let target = with_suffix(duplicate, DUPLICATE_SUFFIX);
            if std::fs::symlink_metadata(&target).is_ok() {
                return Err(ActionError::NameCollision(target));
            }
            Ok(Some(target))
        }
    }
}

/// `path` with `suffix` appended to its final component.
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
