//! Per-file outcomes and run statistics.
//!
//! Workers return one [`FileRecord`] per file; the scheduler folds the
//! records into a [`Statistics`] snapshot once every worker has finished.
//! No counter is shared between threads.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::actions::Strategy;
use crate::scanner::{ContentDigest, HashAlgorithm};

/// Terminal outcome for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Outcome {
    /// First file seen with this content; now the representative.
    New {
        /// Representative that was dropped as stale, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        replaced_stale: Option<PathBuf>,
    },
    /// The file is already the recorded representative.
    AlreadyIndexed,
    /// Same inode as the representative; nothing to do.
    SkippedAlreadyLinked {
        /// Representative path
        original: PathBuf,
    },
    /// Replaced with a hard link to the representative.
    #[serde(rename = "duplicate-hardlinked")]
    Hardlinked {
        /// Representative path
        original: PathBuf,
    },
    /// Deleted.
    #[serde(rename = "duplicate-deleted")]
    Deleted {
        /// Representative path
        original: PathBuf,
    },
    /// Renamed aside.
    #[serde(rename = "duplicate-renamed")]
    Renamed {
        /// Representative path
        original: PathBuf,
        /// New name of the duplicate
        renamed_to: PathBuf,
    },
    /// Matched an exclusion pattern; never hashed.
    #[serde(rename = "skipped-excluded")]
    Excluded,
    /// Hashing or the action failed.
    Error {
        /// Error message
        message: String,
    },
    /// Not processed because shutdown was requested.
    Interrupted,
}

impl Outcome {
    /// Short machine-readable name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::New { .. } => "new",
            Self::AlreadyIndexed => "already-indexed",
            Self::SkippedAlreadyLinked { .. } => "skipped-already-linked",
            Self::Hardlinked { .. } => "duplicate-hardlinked",
            Self::Deleted { .. } => "duplicate-deleted",
            Self::Renamed { .. } => "duplicate-renamed",
            Self::Excluded => "skipped-excluded",
            Self::Error { .. } => "error",
            Self::Interrupted => "interrupted",
        }
    }

    /// Representative this file was resolved against, for duplicates.
    #[must_use]
    pub fn original(&self) -> Option<&PathBuf> {
        match self {
            Self::SkippedAlreadyLinked { original }
            | Self::Hardlinked { original }
            | Self::Deleted { original }
            | Self::Renamed { original, .. } => Some(original),
            _ => None,
        }
    }

    /// Whether a duplicate action was taken (or simulated).
    #[must_use]
    pub fn is_duplicate_action(&self) -> bool {
        matches!(
            self,
            Self::Hardlinked { .. } | Self::Deleted { .. } | Self::Renamed { .. }
        )
    }
}

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// File path
    pub path: PathBuf,
    /// Size in bytes at discovery
    pub size: u64,
    /// Content digest, if it was computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<ContentDigest>,
    /// What happened
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl FileRecord {
    /// Create a record.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, digest: Option<ContentDigest>, outcome: Outcome) -> Self {
        Self {
            path,
            size,
            digest,
            outcome,
        }
    }
}

/// Aggregated counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Files that entered the pipeline (excluded and interrupted files are not counted)
    pub files_processed: usize,
    /// Files matching an exclusion pattern
    pub files_excluded: usize,
    /// Files already indexed or already linked to their representative
    pub files_skipped: usize,
    /// Confirmed duplicates acted on (or simulated)
    pub duplicates_found: usize,
    /// Duplicates whose space was reclaimed (hardlink/delete)
    pub duplicates_removed: usize,
    /// Hard links created
    pub hardlinks_created: usize,
    /// Bytes reclaimed
    pub bytes_saved: u64,
    /// Per-file errors
    pub errors: usize,
    /// Stale index entries replaced
    pub stale_entries: usize,
    /// Files not processed due to shutdown
    pub interrupted: usize,
}

impl Statistics {
    /// Count one record. Each record contributes exactly once.
    pub fn record(&mut self, record: &FileRecord) {
        match &record.outcome {
            Outcome::Excluded => {
                self.files_excluded += 1;
                return;
            }
            Outcome::Interrupted => {
                self.interrupted += 1;
                return;
            }
            _ => self.files_processed += 1,
        }

        match &record.outcome {
            Outcome::New { replaced_stale } => {
                if replaced_stale.is_some() {
                    self.stale_entries += 1;
                }
            }
            Outcome::AlreadyIndexed | Outcome::SkippedAlreadyLinked { .. } => {
                self.files_skipped += 1;
            }
            Outcome::Hardlinked { .. } => {
                self.duplicates_found += 1;
                self.duplicates_removed += 1;
                self.hardlinks_created += 1;
                self.bytes_saved += record.size;
            }
            Outcome::Deleted { .. } => {
                self.duplicates_found += 1;
                self.duplicates_removed += 1;
                self.bytes_saved += record.size;
            }
            Outcome::Renamed { .. } => {
                self.duplicates_found += 1;
            }
            Outcome::Error { .. } => self.errors += 1,
            Outcome::Excluded | Outcome::Interrupted => {}
        }
    }

    /// Combine two partial snapshots.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            files_processed: self.files_processed + other.files_processed,
            files_excluded: self.files_excluded + other.files_excluded,
            files_skipped: self.files_skipped + other.files_skipped,
            duplicates_found: self.duplicates_found + other.duplicates_found,
            duplicates_removed: self.duplicates_removed + other.duplicates_removed,
            hardlinks_created: self.hardlinks_created + other.hardlinks_created,
            bytes_saved: self.bytes_saved + other.bytes_saved,
            errors: self.errors + other.errors,
            stale_entries: self.stale_entries + other.stale_entries,
            interrupted: self.interrupted + other.interrupted,
        }
    }

    /// Fold a set of records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut stats, r| {
            stats.record(r);
            stats
        })
    }
}

/// Prefilter effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrefilterStats {
    /// Digests in the filter at the end of the run
    pub entries: usize,
    /// Lookups skipped because the filter answered "definitely new"
    pub skipped_lookups: usize,
}

/// Everything known about a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Scan root
    pub root: PathBuf,
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Strategy applied to duplicates
    pub strategy: Strategy,
    /// No filesystem changes were made
    pub simulated: bool,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
    /// Aggregated counters
    pub stats: Statistics,
    /// Prefilter metrics, when enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefilter: Option<PrefilterStats>,
    /// Digests in the index after the run
    pub index_entries: usize,
    /// Whether the final index flush succeeded
    pub index_synced: bool,
    /// Whether the run stopped early
    pub interrupted: bool,
    /// Per-file records in enumeration order
    pub records: Vec<FileRecord>,
}

impl RunReport {
    /// Records whose outcome is a duplicate action or an error.
    pub fn notable_records(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter().filter(|r| {
            r.outcome.is_duplicate_action() || matches!(r.outcome, Outcome::Error { .. })
        })
    }
}
