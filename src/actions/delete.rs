//! Remove a duplicate file.

use std::fs;
use std::path::Path;

use super::ActionError;

/// Permanently delete `duplicate`.
///
/// # Errors
///
/// Returns [`ActionError`] if the file cannot be removed.
pub fn delete_duplicate(duplicate: &Path) -> Result<(), ActionError> {
    fs::remove_file(duplicate).map_err(|e| ActionError::from_io(duplicate, e))
}
