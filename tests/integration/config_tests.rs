use clap::Parser;
use figment::providers::Env;
use rustdedup::actions::Strategy;
use rustdedup::cli::{Cli, OutputFormat};
use rustdedup::config::{CliOverrides, ConfigError, EngineConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["rustdedup", "/data"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

fn write_toml(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("rustdedup.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_layers_apply_in_priority_order() {
    let dir = tempdir().unwrap();
    let file = write_toml(
        dir.path(),
        r#"
strategy = "rename"
max_threads = 3
sync_interval = 10
hash_file = "from-file.db"
"#,
    );
    std::env::set_var("RDD_ITEST_LAYERS_SYNC_INTERVAL", "20");
    std::env::set_var("RDD_ITEST_LAYERS_HASH_FILE", "from-env.db");

    let config = EngineConfig::load_from(
        Some(&file),
        Env::prefixed("RDD_ITEST_LAYERS_"),
        CliOverrides::from(&cli(&["--hash-file", "from-cli.db"])),
    )
    .unwrap();

    assert_eq!(config.strategy, Strategy::Rename);
    assert_eq!(config.max_threads, 3);
    assert_eq!(config.sync_interval, 20);
    assert_eq!(config.hash_file, PathBuf::from("from-cli.db"));
}

#[test]
fn test_cli_flags_override_file() {
    let dir = tempdir().unwrap();
    let file = write_toml(
        dir.path(),
        "strategy = \"delete\"\noutput = \"text\"\nmax_threads = 2\n",
    );

    let config = EngineConfig::load_from(
        Some(&file),
        Env::prefixed("RDD_ITEST_CLI_UNUSED_"),
        CliOverrides::from(&cli(&[
            "--strategy",
            "hardlink",
            "-o",
            "json",
            "--dry-run",
            "--buffer-size",
            "4KiB",
        ])),
    )
    .unwrap();

    assert_eq!(config.strategy, Strategy::Hardlink);
    assert_eq!(config.output, OutputFormat::Json);
    assert_eq!(config.max_threads, 2);
    assert!(config.dry_run);
    assert_eq!(config.buffer_size, 4096);
}

#[test]
fn test_cli_excludes_extend_file_excludes() {
    let dir = tempdir().unwrap();
    let file = write_toml(dir.path(), "exclude = [\"*.log\", \"cache/\"]\n");

    let config = EngineConfig::load_from(
        Some(&file),
        Env::prefixed("RDD_ITEST_EXCL_UNUSED_"),
        CliOverrides::from(&cli(&["--exclude", "*.bak", "--exclude", "*.log"])),
    )
    .unwrap();

    assert_eq!(
        config.exclude_patterns(),
        vec!["*.rdd-tmp", "*.log", "cache/", "*.bak"]
    );
}

#[test]
fn test_zero_threads_from_cli_rejected() {
    let result = EngineConfig::load_from(
        None,
        Env::prefixed("RDD_ITEST_ZERO_UNUSED_"),
        CliOverrides::from(&cli(&["--max-threads", "0"])),
    );

    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            field: "max_threads",
            ..
        })
    ));
}

#[test]
fn test_malformed_file_rejected() {
    let dir = tempdir().unwrap();
    let file = write_toml(dir.path(), "max_threads = \"many\"\n");

    let result = EngineConfig::load_from(
        Some(&file),
        Env::prefixed("RDD_ITEST_BAD_UNUSED_"),
        CliOverrides::default(),
    );
    assert!(matches!(result, Err(ConfigError::Load(_))));
}

#[test]
fn test_out_of_range_fp_rate_rejected() {
    let dir = tempdir().unwrap();
    let file = write_toml(dir.path(), "bloom_fp_rate = 1.5\n");

    let result = EngineConfig::load_from(
        Some(&file),
        Env::prefixed("RDD_ITEST_FP_UNUSED_"),
        CliOverrides::default(),
    );
    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            field: "bloom_fp_rate",
            ..
        })
    ));
}

#[test]
fn test_missing_explicit_config_file() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let cli = cli(&["--config", missing.to_str().unwrap()]);

    assert!(matches!(
        EngineConfig::load(&cli),
        Err(ConfigError::FileNotFound(p)) if p == missing
    ));
}
