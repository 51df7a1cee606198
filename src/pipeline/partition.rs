//! Splitting a page set across workers.
//!
//! ## Why round-robin?
//!
//! Page cost often tracks position: scanned appendices at the end, dense
//! figures in the middle. Contiguous slices would hand one worker all the
//! expensive pages. Interleaving (`pages[i]` → chunk `i % n`) spreads them
//! evenly even though the static strategy cannot rebalance at runtime.

/// Number of workers for `page_count` pages.
///
/// `min(max_workers, ceil(page_count / min_pages_per_worker))`, never below 1.
pub fn worker_count(page_count: usize, max_workers: usize, min_pages_per_worker: usize) -> usize {
    let per_worker = min_pages_per_worker.max(1);
    max_workers.min(page_count.div_ceil(per_worker)).max(1)
}

/// Distribute `pages` round-robin into [`worker_count`] chunks.
///
/// Every page lands in exactly one chunk, in its original relative order.
/// Chunks are only empty when `pages` is.
pub fn partition(pages: &[usize], max_workers: usize, min_pages_per_worker: usize) -> Vec<Vec<usize>> {
    let count = worker_count(pages.len(), max_workers, min_pages_per_worker);
    let mut chunks = vec![Vec::with_capacity(pages.len().div_ceil(count)); count];

    for (i, &page) in pages.iter().enumerate() {
        chunks[i % count].push(page);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_respects_both_limits() {
        assert_eq!(worker_count(10, 4, 2), 4);
        assert_eq!(worker_count(10, 8, 3), 4);
        assert_eq!(worker_count(3, 8, 2), 2);
        assert_eq!(worker_count(1, 8, 2), 1);
        assert_eq!(worker_count(0, 8, 2), 1);
        assert_eq!(worker_count(5, 0, 1), 1);
    }

    #[test]
    fn round_robin_interleaves() {
        let chunks = partition(&[0, 1, 2, 3, 4, 5, 6], 3, 1);
        assert_eq!(chunks, vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]);
    }

    #[test]
    fn every_page_appears_exactly_once() {
        let cases: &[(Vec<usize>, usize, usize)] = &[
            ((0..17).collect(), 4, 2),
            (vec![9, 2, 7, 2], 2, 1),
            ((0..3).collect(), 8, 5),
            (vec![42], 1, 1),
        ];
        for (pages, max, min) in cases {
            let chunks = partition(pages, *max, *min);
            assert_eq!(chunks.len(), worker_count(pages.len(), *max, *min));

            let mut flat: Vec<usize> = chunks.concat();
            let mut expected = pages.clone();
            flat.sort_unstable();
            expected.sort_unstable();
            assert_eq!(flat, expected, "pages={pages:?} max={max} min={min}");
            assert!(chunks.iter().all(|c| !c.is_empty()));
        }
    }

    #[test]
    fn empty_input_yields_one_empty_chunk() {
        assert_eq!(partition(&[], 4, 2), vec![Vec::<usize>::new()]);
    }
}
