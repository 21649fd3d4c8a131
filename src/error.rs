//! Exit codes and structured error output.

use serde::Serialize;

use crate::config::ConfigError;
use crate::duplicates::FinderError;
use crate::index::IndexError;

/// Process exit codes.
///
/// - 0: the scan completed (per-file errors are reported, not fatal)
/// - 1: unexpected failure
/// - 2: configuration or startup failure (bad root, corrupt index, ...)
/// - 130: interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Scan completed.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Configuration or startup failed before any file was touched.
    StartupError = 2,
    /// Interrupted by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "RDD000",
            Self::GeneralError => "RDD001",
            Self::StartupError => "RDD002",
            Self::Interrupted => "RDD130",
        }
    }

    /// Classify an error returned from [`crate::run_app`].
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        if let Some(finder) = err.downcast_ref::<FinderError>() {
            return match finder {
                FinderError::Interrupted => Self::Interrupted,
                _ => Self::StartupError,
            };
        }
        if err.downcast_ref::<ConfigError>().is_some() || err.downcast_ref::<IndexError>().is_some()
        {
            return Self::StartupError;
        }
        Self::GeneralError
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "RDD002")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
