use super::common::{config, run, run_with, write};
use rustdedup::actions::Strategy;
use rustdedup::index::HashIndex;
use rustdedup::scanner::FileIdentity;
use std::collections::HashSet;
use std::path::PathBuf;
use tempfile::tempdir;

const COPIES: usize = 120;

fn many_copies(root: &std::path::Path) -> Vec<PathBuf> {
    let mut copies = Vec::with_capacity(COPIES);
    for i in 0..COPIES {
        let rel = format!("dir{}/sub{}/copy{i}.dat", i % 7, i % 3);
        copies.push(write(root, &rel, &b"shared payload ".repeat(64)));
    }
    for i in 0..20 {
        write(root, &format!("unique/u{i}.dat"), format!("unique {i}").as_bytes());
    }
    copies
}

#[test]
fn test_parallel_hardlink_leaves_single_inode() {
    let dir = tempdir().unwrap();
    let copies = many_copies(dir.path());

    let report = run(
        dir.path(),
        config(Strategy::Hardlink).with_max_threads(8),
    );

    assert_eq!(report.stats.errors, 0);
    assert_eq!(report.stats.files_processed, COPIES + 20);
    assert_eq!(report.stats.duplicates_found, COPIES - 1);
    assert_eq!(report.stats.hardlinks_created, COPIES - 1);
    assert_eq!(report.index_entries, 21);

    let identities: HashSet<_> = copies
        .iter()
        .map(|p| FileIdentity::of(p).unwrap())
        .collect();
    assert_eq!(identities.len(), 1);
}

#[test]
fn test_parallel_delete_keeps_one_copy() {
    let dir = tempdir().unwrap();
    let copies = many_copies(dir.path());

    let report = run(dir.path(), config(Strategy::Delete).with_max_threads(8));

    assert_eq!(report.stats.duplicates_removed, COPIES - 1);
    let survivors = copies.iter().filter(|p| p.exists()).count();
    assert_eq!(survivors, 1);
    for i in 0..20 {
        assert!(dir.path().join(format!("unique/u{i}.dat")).exists());
    }
}

#[test]
fn test_records_follow_walk_order_regardless_of_threads() {
    let single = tempdir().unwrap();
    let parallel = tempdir().unwrap();
    many_copies(single.path());
    many_copies(parallel.path());

    let one = run(single.path(), config(Strategy::Rename).with_max_threads(1));
    let eight = run(parallel.path(), config(Strategy::Rename).with_max_threads(8));

    let rel = |report: &rustdedup::duplicates::RunReport| -> Vec<PathBuf> {
        report
            .records
            .iter()
            .map(|r| r.path.strip_prefix(&report.root).unwrap().to_path_buf())
            .collect()
    };
    assert_eq!(rel(&one), rel(&eight));
    assert_eq!(one.stats.duplicates_found, eight.stats.duplicates_found);
}

#[test]
fn test_parallel_second_run_is_quiet() {
    let dir = tempdir().unwrap();
    many_copies(dir.path());
    let mut index = HashIndex::in_memory(config(Strategy::Hardlink).algorithm);

    run_with(
        dir.path(),
        config(Strategy::Hardlink).with_max_threads(8),
        &mut index,
    );
    let second = run_with(
        dir.path(),
        config(Strategy::Hardlink).with_max_threads(8),
        &mut index,
    );

    assert_eq!(second.stats.duplicates_found, 0);
    assert_eq!(second.stats.errors, 0);
    assert_eq!(second.stats.files_skipped, COPIES + 20);
}
