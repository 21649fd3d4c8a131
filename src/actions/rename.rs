//! Move a duplicate aside as `<name>.duplicate`.

use std::fs;
use std::path::{Path, PathBuf};

use super::{with_suffix, ActionError, DUPLICATE_SUFFIX};

/// Rename `duplicate` to `<duplicate>.duplicate`, returning the new path.
///
/// # Errors
///
/// Returns [`ActionError::NameCollision`] if the target name exists, or
/// another [`ActionError`] if the rename fails.
pub fn rename_duplicate(duplicate: &Path) -> Result<PathBuf, ActionError> {
    let target = with_suffix(duplicate, DUPLICATE_SUFFIX);
    if fs::symlink_metadata(&target).is_ok() {
        return Err(ActionError::NameCollision(target));
    }

    fs::rename(duplicate, &target).map_err(|e| ActionError::from_io(duplicate, e))?;
    Ok(target)
}
