//! Document partitioning
//!
//! Slices the page index space of one document into contiguous, non-empty,
//! half-open ranges from a set of split points.

use std::ops::Range;

/// Partition `[0, total_pages)` at the given split points
///
/// Each split point is the inclusive end of one range; the last range always
/// ends at `total_pages`. `split_points` must be strictly ascending and below
/// `total_pages`, which every function in [`crate::split_points`] guarantees.
///
/// ```
/// use pdfsplit_core::partition::partition;
///
/// assert_eq!(partition(5, &[1, 2]), vec![0..2, 2..3, 3..5]);
/// assert_eq!(partition(3, &[]), vec![0..3]);
/// ```
pub fn partition(total_pages: usize, split_points: &[usize]) -> Vec<Range<usize>> {
    debug_assert!(split_points.windows(2).all(|w| w[0] < w[1]));
    debug_assert!(split_points.iter().all(|p| *p < total_pages));

    let mut ranges = Vec::with_capacity(split_points.len() + 1);
    let mut start = 0;

    for &point in split_points {
        ranges.push(start..point + 1);
        start = point + 1;
    }
    if start < total_pages {
        ranges.push(start..total_pages);
    }

    ranges
}
