use rustdedup::actions::Strategy;
use rustdedup::duplicates::{DuplicateFinder, FinderConfig, RunReport};
use rustdedup::index::HashIndex;
use rustdedup::scanner::HashAlgorithm;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub fn write(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// a.txt and b.txt share content, c.txt differs.
pub fn hello_world_tree(root: &Path) {
    write(root, "a.txt", b"hello");
    write(root, "b.txt", b"hello");
    write(root, "c.txt", b"world");
}

pub fn config(strategy: Strategy) -> FinderConfig {
    FinderConfig::default()
        .with_algorithm(HashAlgorithm::preferred())
        .with_strategy(strategy)
        .with_max_threads(2)
}

pub fn run(root: &Path, config: FinderConfig) -> RunReport {
    let mut index = HashIndex::in_memory(config.algorithm);
    DuplicateFinder::new(config).run(root, &mut index).unwrap()
}

pub fn run_with(root: &Path, config: FinderConfig, index: &mut HashIndex) -> RunReport {
    DuplicateFinder::new(config).run(root, index).unwrap()
}

/// Outcome name per path relative to the scanned root.
pub fn outcomes(report: &RunReport) -> BTreeMap<PathBuf, &'static str> {
    report
        .records
        .iter()
        .map(|r| {
            (
                r.path.strip_prefix(&report.root).unwrap().to_path_buf(),
                r.outcome.kind(),
            )
        })
        .collect()
}
