//! Replace a duplicate with a hard link to its representative.
//!
//! The duplicate is moved to `<name>.rdd-tmp`, the link is created under
//! the original name, and the temporary is removed. If linking fails the
//! temporary is moved back. Only when that restore also fails is the file
//! left missing, reported as [`ActionError::PartialReplace`].

use std::fs;
use std::io;
use std::path::Path;

use super::{with_suffix, ActionError, TEMP_SUFFIX};
use crate::scanner::identity::on_different_devices;

/// Replace `duplicate` with a hard link to `original`.
///
/// # Errors
///
/// - [`ActionError::CrossDevice`] if the files are on different filesystems
/// - [`ActionError::NameCollision`] if the temporary name is taken
/// - [`ActionError::PartialReplace`] if `duplicate` could not be restored
/// - other variants for plain I/O failures (nothing changed)
pub fn replace_with_hardlink(original: &Path, duplicate: &Path) -> Result<(), ActionError> {
    let cross_device = on_different_devices(original, duplicate)
        .map_err(|e| ActionError::from_io(duplicate, e))?;
    if cross_device {
        return Err(cross_device_error(original, duplicate));
    }

    let temp = with_suffix(duplicate, TEMP_SUFFIX);
    if fs::symlink_metadata(&temp).is_ok() {
        return Err(ActionError::NameCollision(temp));
    }

    fs::rename(duplicate, &temp).map_err(|e| ActionError::from_io(duplicate, e))?;

    if let Err(link_err) = fs::hard_link(original, duplicate) {
        return match fs::rename(&temp, duplicate) {
            Ok(()) if is_cross_device(&link_err) => Err(cross_device_error(original, duplicate)),
            Ok(()) => Err(ActionError::from_io(duplicate, link_err)),
            Err(restore_err) => {
                log::error!(
                    "Could not restore {} from {} after failed link: {}",
                    duplicate.display(),
                    temp.display(),
                    restore_err
                );
                Err(ActionError::PartialReplace {
                    path: duplicate.to_path_buf(),
                    temp,
                    source: link_err,
                })
            }
        };
    }

    fs::remove_file(&temp).map_err(|e| ActionError::from_io(&temp, e))?;
    Ok(())
}

fn cross_device_error(original: &Path, duplicate: &Path) -> ActionError {
    ActionError::CrossDevice {
        original: original.to_path_buf(),
        duplicate: duplicate.to_path_buf(),
    }
}

fn is_cross_device(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::CrossesDevices
}
