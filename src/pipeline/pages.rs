//! Page-selection resolution.
//!
//! Callers hand us whatever they have: an empty list meaning "everything",
//! negative numbers, indices past the end, repeats. [`resolve_pages`] turns
//! that into the canonical list the rest of the pipeline relies on: every
//! index in `[0, total_pages)`, each at most once, in the order first
//! requested.

use std::collections::HashSet;
use tracing::warn;

/// Resolve a requested zero-based page list against a document's page count.
///
/// Out-of-range entries are skipped with a warning rather than failing the
/// whole request.
pub fn resolve_pages(requested: &[i64], total_pages: usize) -> Vec<usize> {
    if requested.is_empty() {
        return (0..total_pages).collect();
    }

    let mut seen = HashSet::with_capacity(requested.len());
    let mut pages = Vec::with_capacity(requested.len());

    for &page in requested {
        let in_bounds = usize::try_from(page).ok().filter(|&p| p < total_pages);
        let Some(idx) = in_bounds else {
            warn!(
                "Page {} is out of bounds (document has {} pages, valid 0..={}); skipped",
                page,
                total_pages,
                total_pages.saturating_sub(1)
            );
            continue;
        };
        if seen.insert(idx) {
            pages.push(idx);
        }
    }

    pages
}

/// Zero-padding width for file names: digits of the highest page index.
pub fn pad_width(pages: &[usize]) -> usize {
    pages
        .iter()
        .max()
        .map(|max| max.to_string().len())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_requested(pages: &[usize]) -> Vec<i64> {
        pages.iter().map(|&p| p as i64).collect()
    }

    #[test]
    fn empty_request_means_all_pages() {
        assert_eq!(resolve_pages(&[], 5), vec![0, 1, 2, 3, 4]);
        assert!(resolve_pages(&[], 0).is_empty());
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        assert_eq!(resolve_pages(&[2, 2, 3, 2], 5), vec![2, 3]);
        assert_eq!(resolve_pages(&[4, 1, 4, 0, 1], 5), vec![4, 1, 0]);
    }

    #[test]
    fn out_of_range_entries_are_dropped() {
        assert_eq!(resolve_pages(&[9, 11], 10), vec![9]);
        assert_eq!(resolve_pages(&[-1, 0, 10, i64::MAX, i64::MIN], 10), vec![0]);
    }

    #[test]
    fn fully_out_of_range_request_resolves_to_nothing() {
        // Not "all pages": the caller asked for something specific.
        assert!(resolve_pages(&[7, 8], 3).is_empty());
    }

    #[test]
    fn resolution_is_idempotent_and_bounded() {
        let cases: &[(&[i64], usize)] = &[
            (&[], 4),
            (&[3, 3, -2, 1, 99], 4),
            (&[0, 5, 2, 5, 1], 6),
            (&[10, 9, 8], 9),
            (&[1], 0),
        ];
        for &(requested, total) in cases {
            let once = resolve_pages(requested, total);
            assert!(once.iter().all(|&p| p < total), "{requested:?} / {total}");

            let twice = resolve_pages(&as_requested(&once), total);
            if !once.is_empty() {
                assert_eq!(once, twice, "{requested:?} / {total}");
            }
        }
    }

    #[test]
    fn pad_width_uses_highest_index() {
        assert_eq!(pad_width(&[]), 1);
        assert_eq!(pad_width(&[0, 9]), 1);
        assert_eq!(pad_width(&[3, 10]), 2);
        assert_eq!(pad_width(&[120, 4]), 3);
    }
}
