//! Oldest-first eviction.

use crate::entry::{self, Entry};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs;
use std::path::Path;

/// Summary of one eviction pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    /// Number of entries deleted
    pub removed: usize,
    /// Bytes reclaimed by the deletions
    pub freed: u64,
    /// Bytes still occupied once the pass finished
    pub remaining: u64,
}

/// Delete the oldest entries in `directory` until its total size is at most
/// `budget - reserved` (saturating at zero).
///
/// `protect` names an entry that must survive the pass, namely the one just
/// materialized for the caller. When it alone exceeds the ceiling it is the
/// only entry left behind.
///
/// Callers must hold the cache lock: the directory is scanned once and the
/// scan is assumed to stay accurate while entries are deleted.
pub(crate) fn ensure_free_space(
    directory: &Path,
    budget: u64,
    reserved: u64,
    protect: Option<&Path>,
) -> Result<Eviction> {
    let ceiling = budget.saturating_sub(reserved);
    let entries = entry::scan(directory)?;
    let mut report = Eviction { remaining: entry::total_size(&entries), ..Eviction::default() };
    for entry in entries {
        if report.remaining <= ceiling {
            break;
        }
        if protect.is_some_and(|path| path == entry.path) {
            continue;
        }
        remove(&entry)?;
        report.removed += 1;
        report.freed += entry.size;
        report.remaining -= entry.size;
    }
    if report.removed > 0 {
        tracing::info!(
            directory = %directory.display(),
            removed = report.removed,
            freed = report.freed,
            remaining = report.remaining,
            ceiling,
            "Evicted cache entries to stay within budget"
        );
    }
    Ok(report)
}

fn remove(entry: &Entry) -> Result<()> {
    match fs::remove_file(&entry.path) {
        Ok(()) => {
            tracing::debug!(entry = %entry.name, size = entry.size, modified = %entry.modified, "Evicted");
            Ok(())
        },
        // Already gone: the space is reclaimed either way.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).or_raise(|| ErrorKind::Io),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::tests::place;
    use rstest::rstest;

    fn names(directory: &Path) -> Vec<String> {
        entry::scan(directory).unwrap().into_iter().map(|e| e.name).collect()
    }

    #[test]
    fn test_within_budget_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        place(dir.path(), "a.out", 10, 1);
        place(dir.path(), "b.out", 10, 2);
        let report = ensure_free_space(dir.path(), 20, 0, None).unwrap();
        assert_eq!(report, Eviction { removed: 0, freed: 0, remaining: 20 });
        assert_eq!(names(dir.path()), ["a.out", "b.out"]);
    }

    #[test]
    fn test_oldest_removed_first() {
        let dir = tempfile::tempdir().unwrap();
        place(dir.path(), "a.out", 900_000, 1);
        place(dir.path(), "b.out", 900_000, 2);
        place(dir.path(), "c.out", 900_000, 3);
        let report = ensure_free_space(dir.path(), 2_000_000, 0, None).unwrap();
        assert_eq!(report, Eviction { removed: 1, freed: 900_000, remaining: 1_800_000 });
        assert_eq!(names(dir.path()), ["b.out", "c.out"]);
    }

    #[rstest]
    #[case(35, vec!["a.out", "c.out", "d.out"])]
    #[case(25, vec!["c.out", "d.out"])]
    #[case(10, vec!["d.out"])]
    #[case(9, vec![])]
    #[case(0, vec![])]
    fn test_removes_exactly_the_oldest(#[case] budget: u64, #[case] expected: Vec<&str>) {
        let dir = tempfile::tempdir().unwrap();
        // Creation order deliberately differs from name order.
        place(dir.path(), "b.out", 10, 1);
        place(dir.path(), "a.out", 10, 2);
        place(dir.path(), "c.out", 10, 3);
        place(dir.path(), "d.out", 10, 4);
        ensure_free_space(dir.path(), budget, 0, None).unwrap();
        assert_eq!(names(dir.path()), expected);
    }

    #[test]
    fn test_reserved_amount_lowers_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        place(dir.path(), "a.out", 10, 1);
        place(dir.path(), "b.out", 10, 2);
        let report = ensure_free_space(dir.path(), 20, 5, None).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(names(dir.path()), ["b.out"]);
        // A reservation larger than the budget clamps to zero.
        let report = ensure_free_space(dir.path(), 20, 500, None).unwrap();
        assert_eq!(report.remaining, 0);
        assert!(names(dir.path()).is_empty());
    }

    #[test]
    fn test_protected_entry_survives_alone() {
        let dir = tempfile::tempdir().unwrap();
        place(dir.path(), "a.out", 10, 1);
        let fresh = place(dir.path(), "b.out", 50, 2);
        let report = ensure_free_space(dir.path(), 20, 0, Some(&fresh)).unwrap();
        assert_eq!(report, Eviction { removed: 1, freed: 10, remaining: 50 });
        assert_eq!(names(dir.path()), ["b.out"]);
    }

    #[test]
    fn test_protected_entry_is_skipped_not_final() {
        let dir = tempfile::tempdir().unwrap();
        // Same timestamp: the protected entry sorts before its neighbour.
        let fresh = place(dir.path(), "a.out", 10, 5);
        place(dir.path(), "b.out", 10, 5);
        ensure_free_space(dir.path(), 15, 0, Some(&fresh)).unwrap();
        assert_eq!(names(dir.path()), ["a.out"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let report = ensure_free_space(&dir.path().join("gone"), 0, 0, None).unwrap();
        assert_eq!(report, Eviction::default());
    }
}
