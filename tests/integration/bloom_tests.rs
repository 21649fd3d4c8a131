use super::common::{config, hello_world_tree, outcomes, run, run_with, write};
use rustdedup::actions::Strategy;
use rustdedup::index::HashIndex;
use rustdedup::scanner::HashAlgorithm;
use tempfile::tempdir;

fn mixed_tree(root: &std::path::Path) {
    hello_world_tree(root);
    for i in 0..40 {
        write(root, &format!("batch/{i:02}.txt"), format!("{}", i % 13).as_bytes());
    }
}

#[test]
fn test_prefilter_does_not_change_outcomes() {
    let with = tempdir().unwrap();
    let without = tempdir().unwrap();
    mixed_tree(with.path());
    mixed_tree(without.path());

    let filtered = run(
        with.path(),
        config(Strategy::Delete)
            .with_max_threads(1)
            .with_bloom_filter(true),
    );
    let plain = run(without.path(), config(Strategy::Delete).with_max_threads(1));

    assert_eq!(outcomes(&filtered), outcomes(&plain));
    assert_eq!(filtered.stats, plain.stats);
    assert!(filtered.prefilter.is_some());
    assert!(plain.prefilter.is_none());
}

#[test]
fn test_prefilter_skips_lookups_for_new_content() {
    let dir = tempdir().unwrap();
    for i in 0..30 {
        write(dir.path(), &format!("{i:02}.txt"), format!("distinct {i}").as_bytes());
    }

    let report = run(
        dir.path(),
        config(Strategy::Hardlink).with_bloom_filter(true),
    );

    let prefilter = report.prefilter.unwrap();
    assert_eq!(prefilter.entries, 30);
    // A false positive only costs a lookup, so most but not necessarily all are skipped
    assert!(prefilter.skipped_lookups >= 25);
}

#[test]
fn test_prefilter_sees_digests_from_previous_run() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"hello");
    let mut index = HashIndex::in_memory(HashAlgorithm::preferred());
    run_with(dir.path(), config(Strategy::Hardlink), &mut index);

    write(dir.path(), "b.txt", b"hello");
    let report = run_with(
        dir.path(),
        config(Strategy::Hardlink).with_bloom_filter(true),
        &mut index,
    );

    assert_eq!(report.stats.duplicates_found, 1);
    assert_eq!(report.prefilter.unwrap().skipped_lookups, 0);
}
