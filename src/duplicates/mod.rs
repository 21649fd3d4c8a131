//! Duplicate detection and resolution.
//!
//! This module provides functionality for:
//! - Run orchestration over a directory tree ([`finder`])
//! - Serialized digest → representative resolution ([`resolver`])
//! - Per-file outcomes and aggregated statistics ([`stats`])

pub mod finder;
pub mod resolver;
pub mod stats;

pub use finder::{
    default_exclude_patterns, validate_root, DuplicateFinder, FinderConfig, FinderError,
    DEFAULT_MAX_THREADS,
};
pub use resolver::{DuplicateResolver, ResolverSummary};
pub use stats::{FileRecord, Outcome, PrefilterStats, RunReport, Statistics};
