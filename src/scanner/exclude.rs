//! Exclusion patterns with gitignore-style glob semantics.
//!
//! Patterns are compiled once with the `ignore` crate:
//!
//! - `*.tmp` matches a file name at any depth
//! - `backup/*` and `/backup/` are anchored to the scan root
//! - `**/cache/**` matches a directory segment anywhere
//! - a pattern that matches a directory excludes everything beneath it
//!
//! Exact paths (such as the index database) can be excluded as well.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Errors building an [`ExclusionMatcher`].
#[derive(thiserror::Error, Debug)]
pub enum ExcludeError {
    /// A pattern could not be parsed.
    #[error("Invalid exclusion pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Parser message
        message: String,
    },
}

/// Compiled set of exclusion patterns rooted at the scan directory.
#[derive(Debug)]
pub struct ExclusionMatcher {
    root: PathBuf,
    gitignore: Option<Gitignore>,
    exact: Vec<PathBuf>,
}

impl ExclusionMatcher {
    /// Compile `patterns` relative to `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ExcludeError::InvalidPattern`] for the first bad pattern.
    pub fn new<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Self, ExcludeError> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            let pattern = pattern.as_ref();
            builder
                .add_line(None, pattern)
                .map_err(|e| ExcludeError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })?;
        }

        let gitignore = builder
            .build()
            .map_err(|e| ExcludeError::InvalidPattern {
                pattern: patterns
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<_>>()
                    .join(", "),
                message: e.to_string(),
            })?;

        log::debug!(
            "Compiled {} exclusion pattern(s) for {}",
            gitignore.num_ignores(),
            root.display()
        );

        Ok(Self {
            root: root.to_path_buf(),
            gitignore: (!gitignore.is_empty()).then_some(gitignore),
            exact: Vec::new(),
        })
    }

    /// Matcher that excludes nothing.
    #[must_use]
    pub fn empty(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            gitignore: None,
            exact: Vec::new(),
        }
    }

    /// Additionally exclude these exact paths.
    #[must_use]
    pub fn with_exact_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.exact.extend(paths);
        self
    }

    /// Whether `path` (a file) is excluded.
    #[must_use]
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.exact.iter().any(|p| p == path) {
            return true;
        }

        let Some(gi) = &self.gitignore else {
            return false;
        };

        match path.strip_prefix(&self.root) {
            Ok(relative) => gi
                .matched_path_or_any_parents(relative, false)
                .is_ignore(),
            Err(_) => gi.matched(path, false).is_ignore(),
        }
    }

    /// Number of compiled glob patterns.
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.gitignore.as_ref().map_or(0, |g| g.num_ignores() as usize)
    }
}
