use super::common::{hello_world_tree, write};
use clap::Parser;
use rustdedup::cli::Cli;
use rustdedup::error::ExitCode;
use rustdedup::run_app;
use rustdedup::scanner::identity::same_file;
use std::fs;
use tempfile::tempdir;

fn app(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["rustdedup"];
    argv.extend_from_slice(args);
    run_app(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn test_app_hardlinks_and_persists_index() {
    let root = tempdir().unwrap();
    let state = tempdir().unwrap();
    hello_world_tree(root.path());
    let index = state.path().join("index.db");

    let code = app(&[
        root.path().to_str().unwrap(),
        "--hash-file",
        index.to_str().unwrap(),
        "-q",
    ])
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(index.exists());
    assert!(same_file(&root.path().join("a.txt"), &root.path().join("b.txt")).unwrap());
}

#[test]
fn test_app_dry_run_touches_nothing() {
    let root = tempdir().unwrap();
    let state = tempdir().unwrap();
    hello_world_tree(root.path());
    let index = state.path().join("index.db");

    let code = app(&[
        root.path().to_str().unwrap(),
        "--hash-file",
        index.to_str().unwrap(),
        "--strategy",
        "delete",
        "--dry-run",
        "-q",
    ])
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(!index.exists());
    assert!(root.path().join("b.txt").exists());
}

#[test]
fn test_app_index_inside_root() {
    let root = tempdir().unwrap();
    write(root.path(), "a.txt", b"payload");
    let index = root.path().join("inside.db");

    for _ in 0..2 {
        let code = app(&[
            root.path().to_str().unwrap(),
            "--hash-file",
            index.to_str().unwrap(),
            "--strategy",
            "delete",
            "-q",
        ])
        .unwrap();
        assert_eq!(code, ExitCode::Success);
    }
    assert!(index.exists());
    assert!(root.path().join("a.txt").exists());
}

#[test]
fn test_app_missing_root_is_startup_error() {
    let state = tempdir().unwrap();
    let missing = state.path().join("missing");
    let index = state.path().join("index.db");

    let err = app(&[
        missing.to_str().unwrap(),
        "--hash-file",
        index.to_str().unwrap(),
        "-q",
    ])
    .unwrap_err();

    assert_eq!(ExitCode::for_error(&err), ExitCode::StartupError);
    assert!(!index.exists());
}

#[test]
fn test_app_corrupt_index_is_startup_error() {
    let root = tempdir().unwrap();
    let state = tempdir().unwrap();
    hello_world_tree(root.path());
    let index = state.path().join("index.db");
    fs::write(&index, b"corrupted index contents ".repeat(200)).unwrap();

    let err = app(&[
        root.path().to_str().unwrap(),
        "--hash-file",
        index.to_str().unwrap(),
        "-q",
    ])
    .unwrap_err();

    assert_eq!(ExitCode::for_error(&err), ExitCode::StartupError);
    assert!(!same_file(&root.path().join("a.txt"), &root.path().join("b.txt")).unwrap());
}

#[test]
fn test_app_invalid_pattern_is_startup_error() {
    let root = tempdir().unwrap();
    let state = tempdir().unwrap();
    let index = state.path().join("index.db");

    let err = app(&[
        root.path().to_str().unwrap(),
        "--hash-file",
        index.to_str().unwrap(),
        "--exclude",
        "a[",
        "-q",
    ])
    .unwrap_err();

    assert_eq!(ExitCode::for_error(&err), ExitCode::StartupError);
}
