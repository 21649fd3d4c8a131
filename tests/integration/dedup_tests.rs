use super::common::{config, hello_world_tree, outcomes, run, run_with, write};
use rustdedup::actions::Strategy;
use rustdedup::duplicates::Outcome;
use rustdedup::index::HashIndex;
use rustdedup::scanner::identity::same_file;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_hardlink_hello_world() {
    let dir = tempdir().unwrap();
    hello_world_tree(dir.path());

    let report = run(dir.path(), config(Strategy::Hardlink));

    assert_eq!(report.stats.files_processed, 3);
    assert_eq!(report.stats.duplicates_found, 1);
    assert_eq!(report.stats.duplicates_removed, 1);
    assert_eq!(report.stats.hardlinks_created, 1);
    assert_eq!(report.stats.bytes_saved, 5);
    assert_eq!(report.stats.errors, 0);
    assert!(!report.simulated);

    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    let c = dir.path().join("c.txt");
    assert!(same_file(&a, &b).unwrap());
    assert!(!same_file(&a, &c).unwrap());
    assert_eq!(fs::read(&b).unwrap(), b"hello");
    assert_eq!(fs::read(&c).unwrap(), b"world");
    assert!(!dir.path().join("b.txt.rdd-tmp").exists());
}

#[test]
fn test_rename_hello_world() {
    let dir = tempdir().unwrap();
    hello_world_tree(dir.path());

    let report = run(dir.path(), config(Strategy::Rename));

    assert_eq!(report.stats.duplicates_found, 1);
    assert_eq!(report.stats.duplicates_removed, 0);
    assert_eq!(report.stats.bytes_saved, 0);
    assert!(!dir.path().join("b.txt").exists());
    assert_eq!(
        fs::read(dir.path().join("b.txt.duplicate")).unwrap(),
        b"hello"
    );
    assert!(dir.path().join("a.txt").exists());
    assert!(dir.path().join("c.txt").exists());
}

#[test]
fn test_delete_hello_world() {
    let dir = tempdir().unwrap();
    hello_world_tree(dir.path());

    let report = run(dir.path(), config(Strategy::Delete));

    assert_eq!(report.stats.duplicates_removed, 1);
    assert_eq!(report.stats.hardlinks_created, 0);
    assert_eq!(report.stats.bytes_saved, 5);
    assert!(dir.path().join("a.txt").exists());
    assert!(!dir.path().join("b.txt").exists());
    assert!(dir.path().join("c.txt").exists());
}

#[test]
fn test_distinct_content_untouched() {
    let dir = tempdir().unwrap();
    for i in 0..10 {
        write(dir.path(), &format!("f{i}.bin"), format!("content {i}").as_bytes());
    }

    let report = run(dir.path(), config(Strategy::Delete));

    assert_eq!(report.stats.files_processed, 10);
    assert_eq!(report.stats.duplicates_found, 0);
    assert_eq!(report.index_entries, 10);
    for i in 0..10 {
        assert!(dir.path().join(format!("f{i}.bin")).exists());
    }
}

#[test]
fn test_second_hardlink_run_is_idempotent() {
    let dir = tempdir().unwrap();
    hello_world_tree(dir.path());
    let mut index = HashIndex::in_memory(config(Strategy::Hardlink).algorithm);

    let first = run_with(dir.path(), config(Strategy::Hardlink), &mut index);
    assert_eq!(first.stats.duplicates_found, 1);

    let second = run_with(dir.path(), config(Strategy::Hardlink), &mut index);
    assert_eq!(second.stats.duplicates_found, 0);
    assert_eq!(second.stats.hardlinks_created, 0);
    assert_eq!(second.stats.files_skipped, 3);

    let kinds = outcomes(&second);
    assert_eq!(kinds[std::path::Path::new("a.txt")], "already-indexed");
    assert_eq!(kinds[std::path::Path::new("b.txt")], "skipped-already-linked");
}

#[test]
fn test_second_delete_run_is_idempotent() {
    let dir = tempdir().unwrap();
    hello_world_tree(dir.path());
    let mut index = HashIndex::in_memory(config(Strategy::Delete).algorithm);

    run_with(dir.path(), config(Strategy::Delete), &mut index);
    let second = run_with(dir.path(), config(Strategy::Delete), &mut index);

    assert_eq!(second.stats.duplicates_found, 0);
    assert_eq!(second.stats.files_processed, 2);
}

#[test]
fn test_dry_run_matches_real_run() {
    let simulated = tempdir().unwrap();
    let real = tempdir().unwrap();
    for root in [simulated.path(), real.path()] {
        hello_world_tree(root);
        write(root, "sub/d.txt", b"hello");
        write(root, "sub/e.txt", b"world");
        write(root, "sub/f.txt", b"unique");
    }

    let dry = run(
        simulated.path(),
        config(Strategy::Delete).with_max_threads(1).with_dry_run(true),
    );
    let wet = run(real.path(), config(Strategy::Delete).with_max_threads(1));

    assert!(dry.simulated);
    assert_eq!(outcomes(&dry), outcomes(&wet));
    assert_eq!(dry.stats, wet.stats);

    // Nothing changed on the simulated side
    for rel in ["a.txt", "b.txt", "c.txt", "sub/d.txt", "sub/e.txt", "sub/f.txt"] {
        assert!(simulated.path().join(rel).exists(), "{rel} was touched");
    }
    assert!(!real.path().join("b.txt").exists());
}

#[test]
fn test_dry_run_hardlink_does_not_link() {
    let dir = tempdir().unwrap();
    hello_world_tree(dir.path());

    let report = run(dir.path(), config(Strategy::Hardlink).with_dry_run(true));

    assert_eq!(report.stats.hardlinks_created, 1);
    assert!(!same_file(&dir.path().join("a.txt"), &dir.path().join("b.txt")).unwrap());
}

#[test]
fn test_empty_files_are_deduplicated() {
    let dir = tempdir().unwrap();
    write(dir.path(), "empty1", b"");
    write(dir.path(), "empty2", b"");

    let report = run(dir.path(), config(Strategy::Hardlink));

    assert_eq!(report.stats.duplicates_found, 1);
    assert_eq!(report.stats.bytes_saved, 0);
    assert!(same_file(&dir.path().join("empty1"), &dir.path().join("empty2")).unwrap());
}

#[test]
fn test_first_file_in_walk_order_is_representative() {
    let dir = tempdir().unwrap();
    write(dir.path(), "z/late.txt", b"same");
    write(dir.path(), "a/early.txt", b"same");

    let report = run(dir.path(), config(Strategy::Rename).with_max_threads(1));

    let renamed: Vec<_> = report
        .records
        .iter()
        .filter_map(|r| match &r.outcome {
            Outcome::Renamed { original, .. } => Some((r.path.clone(), original.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(renamed.len(), 1);
    assert!(renamed[0].0.ends_with("z/late.txt"));
    assert!(renamed[0].1.ends_with("a/early.txt"));
}

#[test]
fn test_rename_collision_is_per_file_error() {
    let dir = tempdir().unwrap();
    hello_world_tree(dir.path());
    write(dir.path(), "b.txt.duplicate", b"something else");

    let report = run(dir.path(), config(Strategy::Rename).with_max_threads(1));

    assert_eq!(report.stats.errors, 1);
    assert_eq!(report.stats.duplicates_found, 0);
    assert!(dir.path().join("b.txt").exists());
    assert_eq!(
        fs::read(dir.path().join("b.txt.duplicate")).unwrap(),
        b"something else"
    );
}
