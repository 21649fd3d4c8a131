//! Run orchestration: enumerate, exclude, hash in parallel, resolve.
//!
//! # Overview
//!
//! 1. **Walk**: collect regular files under the root in sorted order
//! 2. **Exclude**: drop files matching the exclusion patterns (never hashed)
//! 3. **Hash**: compute content digests on a pool of `max_threads` workers
//! 4. **Resolve**: decide each file's outcome under the resolver lock
//!
//! Every file produces one [`FileRecord`]; records keep enumeration order
//! and are folded into [`Statistics`] once the pool has drained.
//!
//! # Example
//!
//! ```no_run
//! use rustdedup::duplicates::{DuplicateFinder, FinderConfig};
//! use rustdedup::index::HashIndex;
//! use rustdedup::scanner::HashAlgorithm;
//! use std::path::Path;
//!
//! let mut index = HashIndex::in_memory(HashAlgorithm::Sha256);
//! let config = FinderConfig::default()
//!     .with_algorithm(HashAlgorithm::Sha256)
//!     .with_dry_run(true);
//! let report = DuplicateFinder::new(config)
//!     .run(Path::new("."), &mut index)
//!     .unwrap();
//! println!("{} duplicate(s)", report.stats.duplicates_found);
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rayon::prelude::*;

use super::resolver::DuplicateResolver;
use super::stats::{FileRecord, Outcome, RunReport, Statistics};
use crate::actions::{Strategy, TEMP_SUFFIX};
use crate::index::bloom::DEFAULT_FP_RATE;
use crate::index::{BloomPrefilter, HashIndex, IndexError};
use crate::progress::{ProgressCallback, PHASE_HASHING, PHASE_WALKING};
use crate::scanner::{
    ExcludeError, ExclusionMatcher, FileEntry, HashAlgorithm, Hasher, UnavailableAlgorithm,
    Walker, WalkerConfig, DEFAULT_BUFFER_SIZE,
};

/// Default number of hashing workers.
pub const DEFAULT_MAX_THREADS: usize = 4;

/// Exclusion patterns applied when none are configured.
#[must_use]
pub fn default_exclude_patterns() -> Vec<String> {
    vec![format!("*{TEMP_SUFFIX}")]
}

/// Configuration for a deduplication run.
#[derive(Clone)]
pub struct FinderConfig {
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Read buffer size for hashing
    pub buffer_size: usize,
    /// Action applied to duplicates
    pub strategy: Strategy,
    /// Number of hashing workers
    pub max_threads: usize,
    /// Simulate actions and leave the filesystem untouched
    pub dry_run: bool,
    /// Gitignore-style exclusion patterns
    pub exclude_patterns: Vec<String>,
    /// Exact paths that are never processed (e.g. the index file)
    pub excluded_paths: Vec<PathBuf>,
    /// Consult a Bloom prefilter before index lookups
    pub use_bloom_filter: bool,
    /// Target false positive rate of the prefilter
    pub bloom_fp_rate: f64,
    /// Directory walking options
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("algorithm", &self.algorithm)
            .field("buffer_size", &self.buffer_size)
            .field("strategy", &self.strategy)
            .field("max_threads", &self.max_threads)
            .field("dry_run", &self.dry_run)
            .field("exclude_patterns", &self.exclude_patterns)
            .field("excluded_paths", &self.excluded_paths)
            .field("use_bloom_filter", &self.use_bloom_filter)
            .field("bloom_fp_rate", &self.bloom_fp_rate)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::preferred(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            strategy: Strategy::default(),
            max_threads: DEFAULT_MAX_THREADS,
            dry_run: false,
            exclude_patterns: default_exclude_patterns(),
            excluded_paths: Vec::new(),
            use_bloom_filter: false,
            bloom_fp_rate: DEFAULT_FP_RATE,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the hashing buffer size (min 1).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Set the duplicate strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the worker count (min 1).
    #[must_use]
    pub fn with_max_threads(mut self, threads: usize) -> Self {
        self.max_threads = threads.max(1);
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Replace the exclusion patterns.
    #[must_use]
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Add exact paths that are never processed.
    #[must_use]
    pub fn with_excluded_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.excluded_paths.extend(paths);
        self
    }

    /// Enable or disable the Bloom prefilter.
    #[must_use]
    pub fn with_bloom_filter(mut self, enabled: bool) -> Self {
        self.use_bloom_filter = enabled;
        self
    }

    /// Set the Bloom filter false positive rate.
    #[must_use]
    pub fn with_bloom_fp_rate(mut self, rate: f64) -> Self {
        self.bloom_fp_rate = rate;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Errors that abort a run before any file is touched.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// Shutdown was requested before the scan started.
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root could not be resolved.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The index was opened for another algorithm.
    #[error("Index uses '{index}' digests but the run is configured for '{requested}'")]
    AlgorithmMismatch {
        /// Algorithm of the index
        index: HashAlgorithm,
        /// Algorithm requested for the run
        requested: HashAlgorithm,
    },

    /// The requested algorithm is not compiled in.
    #[error(transparent)]
    UnavailableAlgorithm(#[from] UnavailableAlgorithm),

    /// An exclusion pattern is invalid.
    #[error(transparent)]
    Exclude(#[from] ExcludeError),

    /// The index could not be used.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

enum Task {
    Excluded(FileEntry),
    Failed(PathBuf, String),
    Process(FileEntry),
}

/// Deduplication engine for one root directory.
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Deduplicate every regular file under `root` against `index`.
    ///
    /// Per-file failures are recorded in the report and never abort the
    /// run. The index is flushed before returning, including after an
    /// interruption.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if the root is unusable, the index or
    /// algorithm do not match, an exclusion pattern is invalid, or
    /// shutdown was requested before the scan started.
    pub fn run(&self, root: &Path, index: &mut HashIndex) -> Result<RunReport, FinderError> {
        let started_at = Utc::now();
        let root = validate_root(root)?;
        let config = &self.config;

        if index.algorithm() != config.algorithm {
            return Err(FinderError::AlgorithmMismatch {
                index: index.algorithm(),
                requested: config.algorithm,
            });
        }
        let hasher = Hasher::new(config.algorithm, config.buffer_size)?;
        let matcher = ExclusionMatcher::new(&root, config.exclude_patterns.as_slice())?
            .with_exact_paths(config.excluded_paths.iter().cloned());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_threads.max(1))
            .build()?;

        if config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        log::info!(
            "Deduplicating {} using {} digests, strategy {}{}",
            root.display(),
            config.algorithm,
            config.strategy,
            if config.dry_run { " (dry run)" } else { "" }
        );

        let tasks = self.collect_tasks(&root, &matcher);
        let total = tasks
            .iter()
            .filter(|t| matches!(t, Task::Process(_)))
            .count();
        log::info!(
            "Found {} file(s), {} to process",
            tasks.len(),
            total
        );

        let prefilter = config
            .use_bloom_filter
            .then(|| BloomPrefilter::from_digests(index.digests(), total, config.bloom_fp_rate));

        let mut resolver =
            DuplicateResolver::new(index, hasher, config.strategy, config.dry_run);
        if let Some(filter) = prefilter {
            resolver = resolver.with_prefilter(filter);
        }

        if let Some(ref callback) = config.progress_callback {
            callback.on_phase_start(PHASE_HASHING, total);
        }
        let processed = AtomicUsize::new(0);

        let records: Vec<FileRecord> = pool.install(|| {
            tasks
                .into_par_iter()
                .map(|task| self.process(task, &hasher, &resolver, &processed))
                .collect()
        });

        if let Some(ref callback) = config.progress_callback {
            callback.on_phase_end(PHASE_HASHING);
        }

        let summary = resolver.finish();
        let stats = Statistics::from_records(&records);
        let interrupted = config.is_shutdown_requested();
        if interrupted {
            log::warn!(
                "Interrupted: {} file(s) not processed",
                stats.interrupted
            );
        }
        log::info!(
            "Processed {} file(s): {} duplicate(s), {} error(s)",
            stats.files_processed,
            stats.duplicates_found,
            stats.errors
        );

        Ok(RunReport {
            root,
            algorithm: config.algorithm,
            strategy: config.strategy,
            simulated: config.dry_run,
            started_at,
            finished_at: Utc::now(),
            stats,
            prefilter: summary.prefilter,
            index_entries: summary.index_entries,
            index_synced: summary.index_synced,
            interrupted,
            records,
        })
    }

    fn collect_tasks(&self, root: &Path, matcher: &ExclusionMatcher) -> Vec<Task> {
        let config = &self.config;
        if let Some(ref callback) = config.progress_callback {
            callback.on_phase_start(PHASE_WALKING, 0);
        }

        let mut walker = Walker::new(root, config.walker_config.clone());
        if let Some(ref flag) = config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        let mut tasks = Vec::new();
        for result in walker.walk() {
            let task = match result {
                Ok(file) if matcher.is_excluded(&file.path) => {
                    log::debug!("Excluded: {}", file.path.display());
                    Task::Excluded(file)
                }
                Ok(file) => Task::Process(file),
                Err(e) => {
                    log::warn!("{}", e);
                    Task::Failed(scan_error_path(&e), e.to_string())
                }
            };
            tasks.push(task);
            if let Some(ref callback) = config.progress_callback {
                callback.on_progress(tasks.len(), "");
            }
        }

        if let Some(ref callback) = config.progress_callback {
            callback.on_phase_end(PHASE_WALKING);
        }
        tasks
    }

    fn process(
        &self,
        task: Task,
        hasher: &Hasher,
        resolver: &DuplicateResolver<'_>,
        processed: &AtomicUsize,
    ) -> FileRecord {
        let file = match task {
            Task::Excluded(file) => {
                return FileRecord::new(file.path, file.size, None, Outcome::Excluded)
            }
            Task::Failed(path, message) => {
                return FileRecord::new(path, 0, None, Outcome::Error { message })
            }
            Task::Process(file) => file,
        };

        if self.config.is_shutdown_requested() {
            return FileRecord::new(file.path, file.size, None, Outcome::Interrupted);
        }

        let record = match hasher.digest(&file.path) {
            Ok(digest) => {
                let outcome = resolver.resolve(&digest, &file);
                FileRecord::new(file.path, file.size, Some(digest), outcome)
            }
            Err(e) => {
                log::warn!("Failed to hash {}: {}", file.path.display(), e);
                FileRecord::new(
                    file.path,
                    file.size,
                    None,
                    Outcome::Error {
                        message: e.to_string(),
                    },
                )
            }
        };

        let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_progress(current, &record.path.to_string_lossy());
        }
        record
    }
}

/// Check that `root` is an existing directory and return its canonical form.
///
/// # Errors
///
/// Returns [`FinderError::PathNotFound`], [`FinderError::NotADirectory`] or
/// [`FinderError::Io`].
pub fn validate_root(root: &Path) -> Result<PathBuf, FinderError> {
    if !root.exists() {
        return Err(FinderError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(FinderError::NotADirectory(root.to_path_buf()));
    }
    root.canonicalize().map_err(|source| FinderError::Io {
        path: root.to_path_buf(),
        source,
    })
}

fn scan_error_path(error: &crate::scanner::ScanError) -> PathBuf {
    use crate::scanner::ScanError;
    match error {
        ScanError::PermissionDenied(path) | ScanError::NotFound(path) => path.clone(),
        ScanError::Io { path, .. } => path.clone(),
    }
}
