//! Persistent digest index for RustDedup.
//!
//! This module maps content digests to the representative file that first
//! produced them, and keeps that mapping across runs.
//!
//! # Architecture
//!
//! * [`HashIndex`]: in-memory map with O(1) lookups and a queue of pending
//!   mutations, flushed every `sync_interval` mutations and at the end of
//!   a run.
//! * [`store`]: the [`IndexStore`] backend trait and the volatile
//!   [`MemoryStore`].
//! * [`database`]: the durable SQLite backend.
//! * [`bloom`]: the optional [`BloomPrefilter`] built from the index keys.
//!
//! # Insert semantics
//!
//! The first writer wins: [`HashIndex::insert`] on a digest that is
//! already mapped returns `false` and leaves the mapping unchanged. Stale
//! mappings are dropped explicitly with [`HashIndex::remove`].

pub mod bloom;
pub mod database;
pub mod store;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use bloom::BloomPrefilter;
pub use database::{index_files, SqliteStore};
pub use store::{IndexOp, IndexStore, MemoryStore};

use crate::scanner::{ContentDigest, HashAlgorithm};

/// Default number of mutations between automatic flushes.
pub const DEFAULT_SYNC_INTERVAL: usize = 100;

/// Errors from the digest index.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// The index file could not be opened or created.
    #[error("Cannot open index {path}: {source}")]
    Open {
        /// Index location
        path: PathBuf,
        /// Underlying database error
        #[source]
        source: rusqlite::Error,
    },

    /// The file exists but is not a readable index.
    #[error("Index file {path} is corrupt: {message}")]
    Corrupt {
        /// Index location
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// The index was built with another digest algorithm.
    #[error("Index {path} was built with '{found}' digests, but this run uses '{expected}'")]
    AlgorithmMismatch {
        /// Index location
        path: PathBuf,
        /// Algorithm of this run
        expected: String,
        /// Algorithm recorded in the index
        found: String,
    },

    /// Writing pending changes failed.
    #[error("Failed to persist index changes: {0}")]
    Persist(#[from] rusqlite::Error),
}

/// Digest → representative path index.
pub struct HashIndex {
    entries: HashMap<ContentDigest, PathBuf>,
    pending: Vec<IndexOp>,
    store: Box<dyn IndexStore>,
    algorithm: HashAlgorithm,
    sync_interval: usize,
    read_only: bool,
    flushes: usize,
}

impl std::fmt::Debug for HashIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashIndex")
            .field("entries", &self.entries.len())
            .field("pending", &self.pending.len())
            .field("location", &self.store.location())
            .field("algorithm", &self.algorithm)
            .field("sync_interval", &self.sync_interval)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl HashIndex {
    /// Open (or create) the durable index at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Corrupt`] if the file exists but cannot be
    /// parsed; accumulated history is never silently discarded.
    pub fn open(path: &Path, algorithm: HashAlgorithm) -> Result<Self, IndexError> {
        let store = SqliteStore::open(path, algorithm)?;
        let index = Self::with_store(Box::new(store), algorithm)?;
        log::info!(
            "Loaded {} indexed digest(s) from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    /// Open the index at `path` for a dry run.
    ///
    /// The file is read if it exists and never written. A missing or
    /// empty file yields an empty in-memory index.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open) for an existing file.
    pub fn open_read_only(path: &Path, algorithm: HashAlgorithm) -> Result<Self, IndexError> {
        let mut index = if path.metadata().is_ok_and(|m| m.len() > 0) {
            let store = SqliteStore::open_read_only(path, algorithm)?;
            Self::with_store(Box::new(store), algorithm)?
        } else {
            log::debug!(
                "Index {} does not exist; dry run starts empty",
                path.display()
            );
            Self::in_memory(algorithm)
        };
        index.read_only = true;
        Ok(index)
    }

    /// A volatile index.
    #[must_use]
    pub fn in_memory(algorithm: HashAlgorithm) -> Self {
        Self {
            entries: HashMap::new(),
            pending: Vec::new(),
            store: Box::new(MemoryStore::new()),
            algorithm,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            read_only: false,
            flushes: 0,
        }
    }

    /// Build an index over an arbitrary store, loading its contents.
    ///
    /// # Errors
    ///
    /// Propagates the store's load error.
    pub fn with_store(
        mut store: Box<dyn IndexStore>,
        algorithm: HashAlgorithm,
    ) -> Result<Self, IndexError> {
        let entries: HashMap<_, _> = store.load()?.into_iter().collect();
        Ok(Self {
            entries,
            pending: Vec::new(),
            store,
            algorithm,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            read_only: false,
            flushes: 0,
        })
    }

    /// Set the number of mutations between automatic flushes (min 1).
    #[must_use]
    pub fn with_sync_interval(mut self, interval: usize) -> Self {
        self.sync_interval = interval.max(1);
        self
    }

    /// Representative path for `digest`, if any.
    #[must_use]
    pub fn lookup(&self, digest: &ContentDigest) -> Option<&Path> {
        self.entries.get(digest).map(PathBuf::as_path)
    }

    /// Whether `digest` is mapped.
    #[must_use]
    pub fn contains(&self, digest: &ContentDigest) -> bool {
        self.entries.contains_key(digest)
    }

    /// Map `digest` to `path` unless it is already mapped.
    ///
    /// Returns `true` if the mapping was added. May trigger an automatic
    /// flush; a failed flush is logged and retried later.
    pub fn insert(&mut self, digest: ContentDigest, path: PathBuf) -> bool {
        if self.entries.contains_key(&digest) {
            return false;
        }
        self.entries.insert(digest.clone(), path.clone());
        self.record(IndexOp::Put(digest, path));
        true
    }

    /// Drop the mapping for `digest`, returning the old path.
    pub fn remove(&mut self, digest: &ContentDigest) -> Option<PathBuf> {
        let old = self.entries.remove(digest)?;
        self.record(IndexOp::Remove(digest.clone()));
        Some(old)
    }

    fn record(&mut self, op: IndexOp) {
        if self.read_only {
            return;
        }
        self.pending.push(op);
        if self.pending.len() >= self.sync_interval {
            if let Err(e) = self.flush() {
                log::warn!(
                    "Index sync failed ({} change(s) kept in memory): {}",
                    self.pending.len(),
                    e
                );
            }
        }
    }

    /// Persist pending changes.
    ///
    /// On failure the changes stay queued for the next attempt. A
    /// read-only index has nothing to flush.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Persist`] if the store rejects the batch.
    pub fn flush(&mut self) -> Result<(), IndexError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.store.apply(&self.pending)?;
        self.flushes += 1;
        log::debug!(
            "Synced {} index change(s) to {}",
            self.pending.len(),
            self.store
                .location()
                .map_or_else(|| "memory".to_string(), |p| p.display().to_string())
        );
        self.pending.clear();
        Ok(())
    }

    /// Iterate all indexed digests.
    pub fn digests(&self) -> impl ExactSizeIterator<Item = &ContentDigest> {
        self.entries.keys()
    }

    /// Number of indexed digests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of mutations waiting for a flush.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of successful flushes so far.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Digest algorithm the index was opened for.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Whether this index never writes to disk.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Location of the backing file, if any.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.store.location()
    }
}

impl Drop for HashIndex {
    fn drop(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if let Err(e) = self.flush() {
            log::error!(
                "Lost {} unsynced index change(s): {}",
                self.pending.len(),
                e
            );
        }
    }
}
