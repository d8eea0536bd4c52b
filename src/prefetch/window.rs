//! Look-ahead window arithmetic.
//!
//! The window around `position` covers `position - half ..= position + half`
//! with `half = cache_size / 2`, wrapped modulo the image count and deduplicated.

use std::collections::HashSet;

/// Half-width of the window for a given cache size.
pub fn half_width(cache_size: usize) -> usize {
    cache_size / 2
}

/// Window indices ordered nearest-first: `p, p+1, p-1, p+2, p-2, ...`.
///
/// Duplicates produced by wraparound (cache size larger than `len`) appear once.
pub fn window_order(position: usize, cache_size: usize, len: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }

    let half = half_width(cache_size).min(len);
    let position = position % len;
    let mut seen = HashSet::with_capacity(2 * half + 1);
    let mut order = Vec::with_capacity((2 * half + 1).min(len));

    let mut push = |idx: usize| {
        if seen.insert(idx) {
            order.push(idx);
        }
    };

    push(position);
    for k in 1..=half {
        push((position + k) % len);
        push((position + len - k % len) % len);
    }

    order
}

/// The window as a set, for membership tests during cleanup.
pub fn window_set(position: usize, cache_size: usize, len: usize) -> HashSet<usize> {
    window_order(position, cache_size, len).into_iter().collect()
}
