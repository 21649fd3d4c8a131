//! Storage backends for the digest index.
//!
//! The [`HashIndex`](super::HashIndex) keeps every mapping in memory and
//! hands batches of pending mutations to an [`IndexStore`] on flush.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::IndexError;
use crate::scanner::ContentDigest;

/// A pending mutation waiting for the next flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOp {
    /// Map a digest to a representative path.
    Put(ContentDigest, PathBuf),
    /// Drop a digest.
    Remove(ContentDigest),
}

/// Key-value backend for the digest index.
pub trait IndexStore: Send {
    /// Read every stored mapping.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if the backing store cannot be read.
    fn load(&mut self) -> Result<Vec<(ContentDigest, PathBuf)>, IndexError>;

    /// Durably apply `ops` in order, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Persist`] if the batch could not be written.
    fn apply(&mut self, ops: &[IndexOp]) -> Result<(), IndexError>;

    /// Location on disk, if any.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Volatile store. Used for dry runs without an index file and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<ContentDigest, PathBuf>,
    batches: usize,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of batches applied so far.
    #[must_use]
    pub fn batches(&self) -> usize {
        self.batches
    }
}

impl IndexStore for MemoryStore {
    fn load(&mut self) -> Result<Vec<(ContentDigest, PathBuf)>, IndexError> {
        Ok(self
            .entries
            .iter()
            .map(|(d, p)| (d.clone(), p.clone()))
            .collect())
    }

    fn apply(&mut self, ops: &[IndexOp]) -> Result<(), IndexError> {
        for op in ops {
            match op {
                IndexOp::Put(digest, path) => {
                    self.entries.insert(digest.clone(), path.clone());
                }
                IndexOp::Remove(digest) => {
                    self.entries.remove(digest);
                }
            }
        }
        self.batches += 1;
        Ok(())
    }
}
