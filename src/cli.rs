//! Command-line interface definitions for rustdedup.
//!
//! Options left unset on the command line fall through to the config file,
//! then `RUSTDEDUP_*` environment variables, then built-in defaults (see
//! [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Replace duplicates under ~/Photos with hard links
//! rustdedup ~/Photos
//!
//! # Preview what deleting duplicates would do, as JSON
//! rustdedup ~/Downloads --strategy delete --dry-run --output json
//!
//! # Keep the index next to the data and skip build output
//! rustdedup ./data --hash-file ./data/.index.db --exclude 'target/'
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::actions::Strategy;
use crate::scanner::HashAlgorithm;

/// Content-hash file deduplicator.
///
/// Walks a directory tree, hashes every regular file and replaces content
/// duplicates with hard links (or deletes or renames them). A persistent
/// digest index lets later runs recognise files seen before.
#[derive(Debug, Parser)]
#[command(name = "rustdedup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to deduplicate
    #[arg(value_name = "DIRECTORY")]
    pub directory: PathBuf,

    /// Path of the persistent digest index
    #[arg(long, value_name = "PATH")]
    pub hash_file: Option<PathBuf>,

    /// Read buffer size for hashing (e.g., 64KiB, 1MiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub buffer_size: Option<u64>,

    /// Content digest algorithm
    #[arg(long, value_enum, value_name = "ALGORITHM")]
    pub hash_algorithm: Option<HashAlgorithm>,

    /// Action applied to duplicates
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Number of hashing threads (default: 4)
    #[arg(long, value_name = "N")]
    pub max_threads: Option<usize>,

    /// Index mutations between syncs to disk (default: 100)
    #[arg(long, value_name = "N")]
    pub sync_interval: Option<usize>,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,

    /// Report what would happen without changing any file or the index
    #[arg(long)]
    pub dry_run: bool,

    /// Gitignore-style pattern of files to skip (can be specified multiple times)
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude_patterns: Vec<String>,

    /// Consult a Bloom filter before index lookups
    #[arg(long)]
    pub bloom_filter: bool,

    /// Follow symbolic links during the walk
    ///
    /// Warning: symlinked files are then deduplicated through their target.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Report format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON document with per-file records
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use rustdedup::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("64KiB").unwrap(), 65_536);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
