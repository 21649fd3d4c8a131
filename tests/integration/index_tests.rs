use super::common::{config, hello_world_tree, run_with, write};
use rustdedup::actions::Strategy;
use rustdedup::duplicates::Outcome;
use rustdedup::index::{HashIndex, IndexError};
use rustdedup::scanner::identity::same_file;
use rustdedup::scanner::{HashAlgorithm, Hasher, DEFAULT_BUFFER_SIZE};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_restart_detects_duplicate_of_earlier_run() {
    let root = tempdir().unwrap();
    let state = tempdir().unwrap();
    let index_path = state.path().join("index.db");
    hello_world_tree(root.path());
    let algorithm = HashAlgorithm::preferred();

    {
        let mut index = HashIndex::open(&index_path, algorithm).unwrap();
        let report = run_with(root.path(), config(Strategy::Hardlink), &mut index);
        assert!(report.index_synced);
        assert_eq!(report.index_entries, 2);
    }

    let d = write(root.path(), "d.txt", b"hello");

    let mut index = HashIndex::open(&index_path, algorithm).unwrap();
    assert_eq!(index.len(), 2);
    let report = run_with(root.path(), config(Strategy::Hardlink), &mut index);

    assert_eq!(report.stats.duplicates_found, 1);
    let record = report.records.iter().find(|r| r.path.ends_with("d.txt")).unwrap();
    match &record.outcome {
        Outcome::Hardlinked { original } => assert!(original.ends_with("a.txt")),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(same_file(&root.path().join("a.txt"), &d).unwrap());
}

#[test]
fn test_stale_representative_is_replaced() {
    let root = tempdir().unwrap();
    let state = tempdir().unwrap();
    let index_path = state.path().join("index.db");
    let algorithm = HashAlgorithm::preferred();
    write(root.path(), "a.txt", b"hello");

    {
        let mut index = HashIndex::open(&index_path, algorithm).unwrap();
        run_with(root.path(), config(Strategy::Delete), &mut index);
    }

    fs::remove_file(root.path().join("a.txt")).unwrap();
    let b = write(root.path(), "b.txt", b"hello");

    let mut index = HashIndex::open(&index_path, algorithm).unwrap();
    let report = run_with(root.path(), config(Strategy::Delete), &mut index);

    assert_eq!(report.stats.stale_entries, 1);
    assert_eq!(report.stats.duplicates_found, 0);
    assert!(b.exists());
    match &report.records[0].outcome {
        Outcome::New {
            replaced_stale: Some(old),
        } => assert!(old.ends_with("a.txt")),
        other => panic!("unexpected outcome {other:?}"),
    }

    let digest = Hasher::new(algorithm, DEFAULT_BUFFER_SIZE)
        .unwrap()
        .digest_bytes(b"hello");
    let representative = index.lookup(&digest).unwrap();
    assert!(representative.ends_with("b.txt"));
}

#[test]
fn test_corrupt_index_is_rejected() {
    let state = tempdir().unwrap();
    let index_path = state.path().join("index.db");
    let garbage = b"not an index ".repeat(400);
    fs::write(&index_path, &garbage).unwrap();

    let result = HashIndex::open(&index_path, HashAlgorithm::Sha256);
    assert!(matches!(result, Err(IndexError::Corrupt { .. })));

    // The damaged file is left for the user to inspect
    assert_eq!(fs::read(&index_path).unwrap(), garbage);
}

#[test]
fn test_corrupt_index_is_rejected_in_dry_run() {
    let state = tempdir().unwrap();
    let index_path = state.path().join("index.db");
    fs::write(&index_path, b"garbage ".repeat(600)).unwrap();

    let result = HashIndex::open_read_only(&index_path, HashAlgorithm::Sha256);
    assert!(matches!(result, Err(IndexError::Corrupt { .. })));
}

#[test]
fn test_index_algorithm_is_pinned() {
    let state = tempdir().unwrap();
    let index_path = state.path().join("index.db");
    let other = HashAlgorithm::PREFERENCE
        .into_iter()
        .find(|a| a.is_available() && *a != HashAlgorithm::Sha256);
    let Some(other) = other else {
        return;
    };

    drop(HashIndex::open(&index_path, HashAlgorithm::Sha256).unwrap());
    let result = HashIndex::open(&index_path, other);
    assert!(matches!(result, Err(IndexError::AlgorithmMismatch { .. })));
}

#[test]
fn test_dry_run_never_creates_index() {
    let root = tempdir().unwrap();
    let state = tempdir().unwrap();
    let index_path = state.path().join("index.db");
    hello_world_tree(root.path());

    let mut index = HashIndex::open_read_only(&index_path, HashAlgorithm::preferred()).unwrap();
    let report = run_with(
        root.path(),
        config(Strategy::Hardlink).with_dry_run(true),
        &mut index,
    );

    assert_eq!(report.stats.duplicates_found, 1);
    assert!(!index_path.exists());
}

#[test]
fn test_dry_run_leaves_existing_index_unchanged() {
    let root = tempdir().unwrap();
    let state = tempdir().unwrap();
    let index_path = state.path().join("index.db");
    let algorithm = HashAlgorithm::preferred();
    write(root.path(), "a.txt", b"hello");

    {
        let mut index = HashIndex::open(&index_path, algorithm).unwrap();
        run_with(root.path(), config(Strategy::Delete), &mut index);
    }
    write(root.path(), "b.txt", b"new content");
    write(root.path(), "c.txt", b"hello");

    {
        let mut index = HashIndex::open_read_only(&index_path, algorithm).unwrap();
        let report = run_with(
            root.path(),
            config(Strategy::Delete).with_dry_run(true),
            &mut index,
        );
        assert_eq!(report.stats.duplicates_found, 1);
        assert!(root.path().join("c.txt").exists());
    }

    let index = HashIndex::open(&index_path, algorithm).unwrap();
    assert_eq!(index.len(), 1);
}

#[test]
fn test_small_sync_interval_persists_everything() {
    let root = tempdir().unwrap();
    let state = tempdir().unwrap();
    let index_path = state.path().join("index.db");
    let algorithm = HashAlgorithm::preferred();
    for i in 0..25 {
        write(root.path(), &format!("file{i:02}"), format!("{i}").as_bytes());
    }

    {
        let mut index = HashIndex::open(&index_path, algorithm)
            .unwrap()
            .with_sync_interval(3);
        let report = run_with(root.path(), config(Strategy::Hardlink), &mut index);
        assert_eq!(report.index_entries, 25);
        assert!(index.flush_count() >= 8);
        assert_eq!(index.pending_count(), 0);
    }

    let index = HashIndex::open(&index_path, algorithm).unwrap();
    assert_eq!(index.len(), 25);
}
