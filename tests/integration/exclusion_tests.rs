use super::common::{config, run, run_with, write};
use rustdedup::actions::Strategy;
use rustdedup::duplicates::Outcome;
use rustdedup::index::{index_files, HashIndex};
use rustdedup::scanner::HashAlgorithm;
use tempfile::tempdir;

#[test]
fn test_excluded_files_are_never_hashed() {
    let dir = tempdir().unwrap();
    write(dir.path(), "keep.txt", b"same");
    write(dir.path(), "debug.log", b"same");
    write(dir.path(), "nested/trace.log", b"same");

    let report = run(
        dir.path(),
        config(Strategy::Delete).with_exclude_patterns(vec!["*.log".to_string()]),
    );

    assert_eq!(report.stats.files_excluded, 2);
    assert_eq!(report.stats.files_processed, 1);
    assert_eq!(report.stats.duplicates_found, 0);
    assert_eq!(report.index_entries, 1);
    for record in &report.records {
        if record.path.extension().is_some_and(|e| e == "log") {
            assert_eq!(record.outcome, Outcome::Excluded);
            assert!(record.digest.is_none());
        }
    }
    assert!(dir.path().join("debug.log").exists());
    assert!(dir.path().join("nested/trace.log").exists());
}

#[test]
fn test_excluded_directory_contents_untouched() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"payload");
    write(dir.path(), "backup/a.txt", b"payload");
    write(dir.path(), "backup/deep/a.txt", b"payload");

    let report = run(
        dir.path(),
        config(Strategy::Delete).with_exclude_patterns(vec!["backup/".to_string()]),
    );

    assert_eq!(report.stats.files_excluded, 2);
    assert_eq!(report.stats.duplicates_found, 0);
    assert!(dir.path().join("backup/a.txt").exists());
    assert!(dir.path().join("backup/deep/a.txt").exists());
}

#[test]
fn test_excluded_file_is_not_a_representative() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.skip", b"payload");
    write(dir.path(), "b.txt", b"payload");
    write(dir.path(), "c.txt", b"payload");
    let mut index = HashIndex::in_memory(HashAlgorithm::preferred());

    let report = run_with(
        dir.path(),
        config(Strategy::Rename)
            .with_max_threads(1)
            .with_exclude_patterns(vec!["*.skip".to_string()]),
        &mut index,
    );

    assert_eq!(report.stats.duplicates_found, 1);
    let renamed = report
        .records
        .iter()
        .find(|r| r.outcome.is_duplicate_action())
        .unwrap();
    assert!(renamed.path.ends_with("c.txt"));
    assert!(renamed.outcome.original().unwrap().ends_with("b.txt"));
    assert!(index.lookup(&renamed.digest.clone().unwrap()).unwrap().ends_with("b.txt"));
}

#[test]
fn test_leftover_temp_files_are_excluded_by_default() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"payload");
    write(dir.path(), "b.txt.rdd-tmp", b"payload");

    let report = run(dir.path(), config(Strategy::Delete));

    assert_eq!(report.stats.files_excluded, 1);
    assert_eq!(report.stats.duplicates_found, 0);
    assert!(dir.path().join("b.txt.rdd-tmp").exists());
}

#[test]
fn test_index_inside_root_is_excluded() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"payload");
    let index_path = dir.path().canonicalize().unwrap().join(".rustdedup-index.db");
    let algorithm = HashAlgorithm::preferred();

    for _ in 0..2 {
        let mut index = HashIndex::open(&index_path, algorithm).unwrap();
        let report = run_with(
            dir.path(),
            config(Strategy::Delete).with_excluded_paths(index_files(&index_path)),
            &mut index,
        );
        assert_eq!(report.stats.errors, 0);
        assert_eq!(report.stats.duplicates_found, 0);
        assert_eq!(report.index_entries, 1);
    }
    assert!(index_path.exists());
}
