//! rustdedup - content-hash file deduplicator
//!
//! Walks a directory tree, hashes every regular file and resolves content
//! duplicates against a persistent digest index by hard-linking, deleting
//! or renaming them.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod index;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, OutputFormat};
use crate::config::EngineConfig;
use crate::duplicates::{validate_root, DuplicateFinder, FinderConfig, RunReport};
use crate::error::ExitCode;
use crate::index::{index_files, HashIndex};
use crate::output::{JsonOutput, TextOutput};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::WalkerConfig;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error when the run cannot start (configuration, root, index)
/// or the report cannot be written. Per-file failures are part of the
/// report instead.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = EngineConfig::load(&cli)?;
    log::debug!("Effective configuration: {:?}", config);

    let root = validate_root(&cli.directory)?;
    let index_path = resolve_index_path(&config.hash_file)
        .with_context(|| format!("Cannot resolve index path {}", config.hash_file.display()))?;

    let mut index = if config.dry_run {
        HashIndex::open_read_only(&index_path, config.hash_algorithm)?
    } else {
        HashIndex::open(&index_path, config.hash_algorithm)?
    }
    .with_sync_interval(config.sync_interval);

    let handler = signal::install_handler()?;

    let mut finder_config = FinderConfig::default()
        .with_algorithm(config.hash_algorithm)
        .with_buffer_size(config.buffer_size)
        .with_strategy(config.strategy)
        .with_max_threads(config.max_threads)
        .with_dry_run(config.dry_run)
        .with_exclude_patterns(config.exclude_patterns())
        .with_excluded_paths(index_files(&index_path))
        .with_bloom_filter(config.bloom_filter)
        .with_bloom_fp_rate(config.bloom_fp_rate)
        .with_walker_config(WalkerConfig::new(
            config.follow_symlinks,
            config.skip_hidden,
        ))
        .with_shutdown_flag(handler.get_flag());
    if config.progress && !cli.quiet {
        let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(false));
        finder_config = finder_config.with_progress_callback(progress);
    }

    let report = DuplicateFinder::new(finder_config).run(&root, &mut index)?;
    drop(index);

    let exit_code = if report.interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::Success
    };
    write_report(&report, config.output, cli.quiet, exit_code)
        .context("Failed to write report")?;
    Ok(exit_code)
}

fn write_report(
    report: &RunReport,
    format: OutputFormat,
    quiet: bool,
    exit_code: ExitCode,
) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => JsonOutput::new(report, exit_code).write_to(&mut out)?,
        OutputFormat::Text if quiet => {}
        OutputFormat::Text => TextOutput::new(report)
            .with_actions(report.simulated)
            .write_to(&mut out)?,
    }
    out.flush()
}

/// Absolute index location with a canonical parent directory, so it can
/// be matched against walked paths.
fn resolve_index_path(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) if parent.is_dir() => Ok(parent.canonicalize()?.join(name)),
        _ => Ok(absolute),
    }
}
