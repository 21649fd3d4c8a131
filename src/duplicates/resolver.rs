//! Serialized duplicate resolution.
//!
//! Hashing happens in parallel; deciding what a digest means does not.
//! [`DuplicateResolver`] keeps the index, the optional prefilter and the
//! set of already re-verified representatives behind one mutex, so two
//! workers holding the same digest can never both become the original.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::stats::{Outcome, PrefilterStats};
use crate::actions::{self, ActionError, Strategy};
use crate::index::{BloomPrefilter, HashIndex};
use crate::scanner::identity::same_file;
use crate::scanner::{ContentDigest, FileEntry, Hasher};

struct ResolverState<'a> {
    index: &'a mut HashIndex,
    prefilter: Option<BloomPrefilter>,
    /// Digests whose representative is known to be current in this run.
    verified: HashSet<ContentDigest>,
    prefilter_skips: usize,
}

/// Index state after the final flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSummary {
    /// Digests in the index
    pub index_entries: usize,
    /// Whether every change reached the store
    pub index_synced: bool,
    /// Prefilter metrics, when enabled
    pub prefilter: Option<PrefilterStats>,
}

/// Decides the outcome for each hashed file.
pub struct DuplicateResolver<'a> {
    state: Mutex<ResolverState<'a>>,
    strategy: Strategy,
    dry_run: bool,
    hasher: Hasher,
}

impl<'a> DuplicateResolver<'a> {
    /// Create a resolver over `index`.
    ///
    /// `hasher` is used to re-verify representatives loaded from a
    /// previous run and must use the index's algorithm.
    #[must_use]
    pub fn new(index: &'a mut HashIndex, hasher: Hasher, strategy: Strategy, dry_run: bool) -> Self {
        Self {
            state: Mutex::new(ResolverState {
                index,
                prefilter: None,
                verified: HashSet::new(),
                prefilter_skips: 0,
            }),
            strategy,
            dry_run,
            hasher,
        }
    }

    /// Enable the Bloom prefilter.
    #[must_use]
    pub fn with_prefilter(mut self, prefilter: BloomPrefilter) -> Self {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .prefilter = Some(prefilter);
        self
    }

    /// Strategy applied to duplicates.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Whether actions are only simulated.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn lock(&self) -> MutexGuard<'_, ResolverState<'a>> {
        // A panicking worker cannot leave the map half-updated
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve one hashed file.
    pub fn resolve(&self, digest: &ContentDigest, entry: &FileEntry) -> Outcome {
        let mut state = self.lock();

        let definitely_new = state
            .prefilter
            .as_ref()
            .is_some_and(|filter| !filter.might_contain(digest));
        let known = if definitely_new {
            state.prefilter_skips += 1;
            None
        } else {
            state.index.lookup(digest).map(Path::to_path_buf)
        };

        let Some(original) = known else {
            self.register(&mut state, digest, &entry.path);
            log::debug!("New: {}", entry.path.display());
            return Outcome::New {
                replaced_stale: None,
            };
        };

        if original == entry.path {
            state.verified.insert(digest.clone());
            log::debug!("Already indexed: {}", entry.path.display());
            return Outcome::AlreadyIndexed;
        }

        if self.is_stale(&mut state, digest, &original, entry.size) {
            state.index.remove(digest);
            self.register(&mut state, digest, &entry.path);
            log::info!(
                "Replaced stale representative {} with {}",
                original.display(),
                entry.path.display()
            );
            return Outcome::New {
                replaced_stale: Some(original),
            };
        }

        match same_file(&original, &entry.path) {
            Ok(true) => {
                log::debug!(
                    "Already linked: {} -> {}",
                    entry.path.display(),
                    original.display()
                );
                return Outcome::SkippedAlreadyLinked { original };
            }
            Ok(false) => {}
            Err(e) => return error_outcome(&ActionError::from_io(&entry.path, e)),
        }

        // Lock held across the action; the representative cannot change meanwhile.
        let result = if self.dry_run {
            actions::simulate(self.strategy, &original, &entry.path)
        } else {
            actions::apply(self.strategy, &original, &entry.path)
        };
        drop(state);

        match result {
            Ok(renamed_to) => self.action_outcome(original, &entry.path, renamed_to),
            Err(e) => error_outcome(&e),
        }
    }

    fn register(&self, state: &mut ResolverState<'a>, digest: &ContentDigest, path: &Path) {
        state.index.insert(digest.clone(), path.to_path_buf());
        if let Some(filter) = state.prefilter.as_mut() {
            filter.add(digest);
        }
        state.verified.insert(digest.clone());
    }

    /// Whether the mapping `digest -> original` no longer describes a file
    /// with that content. Representatives from previous runs are re-hashed
    /// once per run.
    fn is_stale(
        &self,
        state: &mut ResolverState<'a>,
        digest: &ContentDigest,
        original: &Path,
        size: u64,
    ) -> bool {
        let metadata = match fs::metadata(original) {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Representative {} unreadable: {}", original.display(), e);
                return true;
            }
        };
        if !metadata.is_file() || metadata.len() != size {
            return true;
        }
        if state.verified.contains(digest) {
            return false;
        }

        match self.hasher.digest(original) {
            Ok(current) if current == *digest => {
                state.verified.insert(digest.clone());
                false
            }
            Ok(_) => true,
            Err(e) => {
                log::warn!("Cannot re-verify {}: {}", original.display(), e);
                true
            }
        }
    }

    fn action_outcome(
        &self,
        original: PathBuf,
        duplicate: &Path,
        renamed_to: Option<PathBuf>,
    ) -> Outcome {
        let prefix = if self.dry_run { "[dry run] " } else { "" };
        match (self.strategy, renamed_to) {
            (Strategy::Rename, Some(renamed_to)) => {
                log::info!(
                    "{}Renamed duplicate {} -> {}",
                    prefix,
                    duplicate.display(),
                    renamed_to.display()
                );
                Outcome::Renamed {
                    original,
                    renamed_to,
                }
            }
            (Strategy::Delete, _) => {
                log::info!(
                    "{}Deleted duplicate {} (original {})",
                    prefix,
                    duplicate.display(),
                    original.display()
                );
                Outcome::Deleted { original }
            }
            _ => {
                log::info!(
                    "{}Hardlinked {} -> {}",
                    prefix,
                    duplicate.display(),
                    original.display()
                );
                Outcome::Hardlinked { original }
            }
        }
    }

    /// Flush the index, retrying once, and report its final state.
    pub fn finish(self) -> ResolverSummary {
        let state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);

        let mut synced = state.index.flush().is_ok();
        if !synced {
            log::warn!("Final index sync failed; retrying");
            synced = match state.index.flush() {
                Ok(()) => true,
                Err(e) => {
                    log::error!(
                        "Index sync failed, {} change(s) not persisted: {}",
                        state.index.pending_count(),
                        e
                    );
                    false
                }
            };
        }

        ResolverSummary {
            index_entries: state.index.len(),
            index_synced: synced,
            prefilter: state.prefilter.as_ref().map(|filter| PrefilterStats {
                entries: filter.len(),
                skipped_lookups: state.prefilter_skips,
            }),
        }
    }
}

fn error_outcome(error: &ActionError) -> Outcome {
    if error.is_fatal() {
        log::error!("{}", error);
    } else {
        log::warn!("{}", error);
    }
    Outcome::Error {
        message: error.to_string(),
    }
}
