//! Assertion helpers for tests.

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::path::Path;

/// Assert bytes are a PNG stream
pub fn assert_png(bytes: &[u8]) {
    assert!(
        bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "Expected PNG data, got {} bytes starting with {:?}",
        bytes.len(),
        &bytes[..8.min(bytes.len())]
    );
}

/// Read a one-id-per-line split file
pub fn read_ids(path: &Path) -> BTreeSet<String> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()))
        .lines()
        .map(str::to_string)
        .collect()
}

/// Assert the split files in `dir` form valid folds over `all`
pub fn assert_valid_folds(dir: &Path, folds: usize, all: &BTreeSet<String>) {
    let mut validated = BTreeSet::new();
    for k in 0..folds {
        let train = read_ids(&dir.join(format!("fold_{k}.txt")));
        let valid = read_ids(&dir.join(format!("valid_{k}.txt")));
        assert!(
            train.is_disjoint(&valid),
            "fold {k}: train and valid overlap"
        );
        let union: BTreeSet<String> = train.union(&valid).cloned().collect();
        assert_eq!(&union, all, "fold {k} does not cover the corpus");
        for id in valid {
            assert!(validated.insert(id.clone()), "{id} validated twice");
        }
    }
    assert_eq!(&validated, all, "some ids are never validated");
}
