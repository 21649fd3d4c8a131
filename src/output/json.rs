//! JSON report for scripting.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "root": "/data",
//!   "algorithm": "xxh3",
//!   "strategy": "hardlink",
//!   "simulated": false,
//!   "started_at": "2024-01-01T00:00:00Z",
//!   "finished_at": "2024-01-01T00:00:01Z",
//!   "duration_ms": 1000,
//!   "interrupted": false,
//!   "exit_code": 0,
//!   "exit_code_name": "RDD000",
//!   "index": { "entries": 2, "synced": true },
//!   "statistics": { "files_processed": 3, "duplicates_found": 1, "...": 0 },
//!   "records": [
//!     { "path": "/data/b.txt", "size": 5, "digest": "…", "outcome": "duplicate-hardlinked", "original": "/data/a.txt" }
//!   ]
//! }
//! ```
//!
//! Only records with an action or an error are listed; new and skipped
//! files appear in the counters alone.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::actions::Strategy;
use crate::duplicates::{FileRecord, PrefilterStats, RunReport, Statistics};
use crate::error::ExitCode;
use crate::scanner::HashAlgorithm;

/// Index state in the report.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct JsonIndex {
    /// Digests in the index after the run
    pub entries: usize,
    /// Whether the final sync succeeded
    pub synced: bool,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Scan root
    pub root: &'a Path,
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Duplicate strategy
    pub strategy: Strategy,
    /// Whether the run was a dry run
    pub simulated: bool,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: i64,
    /// Whether the run was interrupted
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "RDD000")
    pub exit_code_name: &'static str,
    /// Index state
    pub index: JsonIndex,
    /// Prefilter metrics, when enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefilter: Option<PrefilterStats>,
    /// Aggregated counters
    pub statistics: Statistics,
    /// Records with an action or an error
    pub records: Vec<&'a FileRecord>,
}

impl<'a> JsonOutput<'a> {
    /// Build the output for `report`.
    #[must_use]
    pub fn new(report: &'a RunReport, exit_code: ExitCode) -> Self {
        Self {
            root: &report.root,
            algorithm: report.algorithm,
            strategy: report.strategy,
            simulated: report.simulated,
            started_at: report.started_at,
            finished_at: report.finished_at,
            duration_ms: (report.finished_at - report.started_at).num_milliseconds(),
            interrupted: report.interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
            index: JsonIndex {
                entries: report.index_entries,
                synced: report.index_synced,
            },
            prefilter: report.prefilter,
            statistics: report.stats,
            records: report.notable_records().collect(),
        }
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)
    }
}
