//! Device + inode identity for same-file and cross-device checks.
//!
//! # Overview
//!
//! Hardlinks are multiple directory entries pointing to the same inode on
//! disk. Comparing path strings cannot tell them apart, so the resolver uses
//! the `(device, inode)` pair instead.
//!
//! # Platform Support
//!
//! - **Unix**: Uses `(dev, ino)` from file metadata
//! - **Other**: No inode information; [`same_file`] falls back to comparing
//!   canonicalized paths and the device check is skipped
//!
//! # Example
//!
//! ```no_run
//! use rustdedup::scanner::identity::same_file;
//! use std::path::Path;
//!
//! if same_file(Path::new("a.txt"), Path::new("b.txt")).unwrap_or(false) {
//!     println!("already linked");
//! }
//! ```

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

/// Platform identity of a file: `(device, inode)` on Unix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    /// Device (filesystem) id
    pub dev: u64,
    /// Inode number
    pub ino: u64,
}

impl FileIdentity {
    /// Identity from already-fetched metadata.
    ///
    /// Returns `None` on platforms without inode information.
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    #[must_use]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }

    /// Identity of the file at `path` (symlinks are followed).
    ///
    /// # Errors
    ///
    /// Returns the I/O error from reading metadata.
    pub fn of(path: &Path) -> io::Result<Option<Self>> {
        fs::metadata(path).map(|m| Self::from_metadata(&m))
    }

    /// Whether identity checks are supported on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

/// Check whether two paths refer to the same underlying file.
///
/// # Errors
///
/// Returns an I/O error if either path cannot be inspected.
pub fn same_file(a: &Path, b: &Path) -> io::Result<bool> {
    match (FileIdentity::of(a)?, FileIdentity::of(b)?) {
        (Some(ia), Some(ib)) => Ok(ia == ib),
        _ => Ok(fs::canonicalize(a)? == fs::canonicalize(b)?),
    }
}

/// Check whether two paths live on different devices.
///
/// Returns `Ok(false)` when the platform cannot tell.
///
/// # Errors
///
/// Returns an I/O error if either path cannot be inspected.
pub fn on_different_devices(a: &Path, b: &Path) -> io::Result<bool> {
    match (FileIdentity::of(a)?, FileIdentity::of(b)?) {
        (Some(ia), Some(ib)) => Ok(ia.dev != ib.dev),
        _ => Ok(false),
    }
}
