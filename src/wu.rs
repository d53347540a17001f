//! Wu's color quantization method (greedy orthogonal bipartitioning).
//!
//! This preclustering method progressively splits the histogram box whose best
//! axis-aligned cut gives the greatest decrease in variance. All split decisions are
//! computed in closed form from color moments; pixels are never rescanned.
//!
//! Unlike implementations that bin colors into a fixed grid, boxes here range over the
//! exact histogram entries. A box with at least two distinct colors always admits a cut,
//! so the resulting palette always has exactly `min(k, distinct colors)` entries.

// Relevant paper (free access):
// Xiaolin Wu, Color quantization by dynamic programming and principal analysis,
// ACM Transactions on Graphics, vol. 11, no. 4, 348-372, 1992.
// https://doi.org/10.1145/146443.146475

use crate::{
    ColorHistogram, ColorStats, PaletteSize,
};
use core::cmp::Reverse;
use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;

/// An axis-aligned box over a contiguous range of the entry permutation.
#[derive(Debug, Clone)]
struct BoxNode {
    /// The start of the box's range in the permutation (inclusive).
    start: u32,
    /// The end of the box's range in the permutation (exclusive).
    end: u32,
    /// The aggregated moments of the entries inside the box.
    stats: ColorStats,
    /// The best cut found for this box, if it can be split at all.
    cut: Option<PlannedCut>,
    /// Whether the box is still part of the partition or was superseded by a split.
    alive: bool,
}

/// The best cut of a box: the channel and permutation position to split at, and the
/// variance reduction the split achieves.
#[derive(Debug, Clone, Copy)]
struct PlannedCut {
    /// The channel to cut along.
    channel: u8,
    /// The absolute permutation index the box is split at.
    position: u32,
    /// The decrease in total variance achieved by this cut.
    reduction: f64,
}

/// Sort a permutation range along one channel.
///
/// The entry index is part of the sort key, making the resulting permutation
/// independent of the order the range was in beforehand.
#[inline]
fn sort_along(order: &mut [u32], colors: &[[f64; 3]], channel: u8) {
    let c = usize::from(channel);
    order.sort_unstable_by_key(|&i| (OrderedFloat(colors[i as usize][c]), i));
}

/// Find the best cut of the given permutation range.
///
/// Per channel, every boundary between distinct adjacent channel values is evaluated by
/// the between-part objective (maximizing it minimizes the within-part variance).
/// Ties are broken by larger channel marginal range, then lower channel index, then
/// lower cut position.
fn eval_cut(
    hist: &ColorHistogram,
    order: &mut [u32],
    start: u32,
    stats: &ColorStats,
) -> Option<PlannedCut> {
    if order.len() < 2 {
        return None;
    }

    let colors = hist.colors();
    let total_objective = stats.weighted_square_sum();

    // (reduction, marginal range, Reverse(channel), Reverse(position)): maximized
    // lexicographically, implementing the tie-break order.
    let mut best: Option<(f64, f64, Reverse<u8>, Reverse<u32>)> = None;

    for channel in 0u8..3 {
        sort_along(order, colors, channel);

        let c = usize::from(channel);
        let first = colors[order[0] as usize][c];
        let last = colors[order[order.len() - 1] as usize][c];
        let range = last - first;
        if range <= 0.0 {
            continue;
        }

        let mut prefix = ColorStats::ZERO;
        for i in 1..order.len() {
            let prev = order[i - 1] as usize;
            prefix += hist.entry_stats(prev);

            if colors[prev][c] == colors[order[i] as usize][c] {
                continue;
            }

            let left = prefix;
            let right = *stats - left;
            let objective = left.weighted_square_sum() + right.weighted_square_sum();
            let reduction = objective - total_objective;

            #[allow(clippy::cast_possible_truncation)]
            let candidate = (reduction, range, Reverse(channel), Reverse(start + i as u32));
            if best.is_none_or(|best| {
                let key = |(r, m, ch, pos): (f64, f64, Reverse<u8>, Reverse<u32>)| {
                    (OrderedFloat(r), OrderedFloat(m), ch, pos)
                };
                key(candidate) > key(best)
            }) {
                best = Some(candidate);
            }
        }
    }

    best.and_then(|(reduction, _, Reverse(channel), Reverse(position))| {
        (reduction > 0.0).then_some(PlannedCut { channel, position, reduction })
    })
}

/// The moments of a permutation range, summed entry by entry.
fn range_stats(hist: &ColorHistogram, order: &[u32]) -> ColorStats {
    let mut stats = ColorStats::ZERO;
    for &i in order {
        stats += hist.entry_stats(i as usize);
    }
    stats
}

/// The final boxes of a Wu run, in creation order.
fn split_boxes(hist: &ColorHistogram, k: PaletteSize) -> Vec<BoxNode> {
    #[allow(clippy::cast_possible_truncation)]
    let mut order: Vec<u32> = (0..hist.len() as u32).collect();

    let root_stats = range_stats(hist, &order);
    let root_cut = eval_cut(hist, &mut order, 0, &root_stats);
    #[allow(clippy::cast_possible_truncation)]
    let root = BoxNode {
        start: 0,
        end: hist.len() as u32,
        stats: root_stats,
        cut: root_cut,
        alive: true,
    };

    let mut pool = vec![root];
    let mut heap = BinaryHeap::new();
    if let Some(cut) = pool[0].cut {
        heap.push((OrderedFloat(cut.reduction), Reverse(0usize)));
    }

    let mut alive = 1;
    while alive < k.as_usize() {
        let Some((_, Reverse(id))) = heap.pop() else {
            // no box can be split any further
            break;
        };

        let (start, end, stats, cut) = {
            let node = &pool[id];
            #[allow(clippy::expect_used)] // only boxes with a cut enter the heap
            let cut = node.cut.expect("queued box has a planned cut");
            (node.start, node.end, node.stats, cut)
        };

        let slice = &mut order[start as usize..end as usize];
        sort_along(slice, hist.colors(), cut.channel);

        let left_stats = range_stats(hist, &order[start as usize..cut.position as usize]);
        let right_stats = stats - left_stats;

        let left_cut = eval_cut(
            hist,
            &mut order[start as usize..cut.position as usize],
            start,
            &left_stats,
        );
        let right_cut = eval_cut(
            hist,
            &mut order[cut.position as usize..end as usize],
            cut.position,
            &right_stats,
        );

        pool[id].alive = false;
        for (range, stats, cut) in [
            ((start, cut.position), left_stats, left_cut),
            ((cut.position, end), right_stats, right_cut),
        ] {
            let child = pool.len();
            pool.push(BoxNode {
                start: range.0,
                end: range.1,
                stats,
                cut,
                alive: true,
            });
            if let Some(cut) = cut {
                heap.push((OrderedFloat(cut.reduction), Reverse(child)));
            }
        }

        alive += 1;
    }

    pool
}

/// Compute a palette of at most `k` working space colors from a histogram.
///
/// The palette has exactly `min(k, hist.len())` entries, each the mass-weighted
/// centroid of one final box.
#[must_use]
pub fn palette(hist: &ColorHistogram, k: PaletteSize) -> Vec<[f64; 3]> {
    palette_and_counts(hist, k).0
}

/// Compute a palette of at most `k` working space colors and the histogram mass
/// assigned to each palette color.
#[must_use]
pub fn palette_and_counts(hist: &ColorHistogram, k: PaletteSize) -> (Vec<[f64; 3]>, Vec<u32>) {
    if hist.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let pool = split_boxes(hist, k);

    let mut palette = Vec::new();
    let mut counts = Vec::new();
    for node in pool.iter().filter(|node| node.alive) {
        palette.push(node.stats.centroid());
        counts.push(node.stats.count);
    }
    (palette, counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{assert_distinct_colors, test_working_colors};

    fn histogram(n: usize) -> ColorHistogram {
        ColorHistogram::new(&test_working_colors(n))
    }

    #[test]
    fn fewer_distinct_colors_than_k() {
        let pixels = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
        ];
        let hist = ColorHistogram::new(&pixels);
        let (palette, counts) = palette_and_counts(&hist, PaletteSize::MAX);
        assert_eq!(palette.len(), 4);
        assert_eq!(counts.iter().copied().sum::<u32>(), 5);
        assert_distinct_colors(&palette);
    }

    #[test]
    fn exact_palette_size_when_k_is_smaller() {
        let hist = histogram(4096);
        assert!(hist.len() > 16);
        for k in [1usize, 2, 3, 7, 16] {
            let palette = palette(&hist, k.try_into().unwrap());
            assert_eq!(palette.len(), k);
            assert_distinct_colors(&palette);
        }
    }

    #[test]
    fn mass_is_conserved() {
        let hist = histogram(2048);
        for k in [1usize, 5, 32, 256] {
            let (_, counts) = palette_and_counts(&hist, k.try_into().unwrap());
            assert_eq!(counts.iter().copied().sum::<u32>(), hist.total_count());
            assert!(counts.iter().all(|&count| count > 0));
        }
    }

    #[test]
    fn single_color_image() {
        let hist = ColorHistogram::new(&vec![[0.25, 0.5, 0.75]; 99]);
        let (palette, counts) = palette_and_counts(&hist, PaletteSize::MAX);
        assert_eq!(palette.len(), 1);
        assert_eq!(counts, vec![99]);
        for c in 0..3 {
            assert!((palette[0][c] - [0.25, 0.5, 0.75][c]).abs() < 1e-12);
        }
    }

    #[test]
    fn k_of_one_returns_global_centroid() {
        let hist = histogram(512);
        let palette = palette(&hist, PaletteSize::MIN);
        assert_eq!(palette.len(), 1);
        let expected = hist.stats().centroid();
        for c in 0..3 {
            assert!((palette[0][c] - expected[c]).abs() < 1e-9);
        }
    }

    #[test]
    fn deterministic() {
        let hist = histogram(2048);
        let a = palette_and_counts(&hist, 64usize.try_into().unwrap());
        let b = palette_and_counts(&hist, 64usize.try_into().unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn two_clusters_are_separated() {
        // Two tight clusters far apart must end up in different boxes at k = 2.
        let mut pixels = Vec::new();
        for i in 0..10 {
            let eps = f64::from(i) * 1e-4;
            pixels.push([eps, 0.0, 0.0]);
            pixels.push([100.0 + eps, 50.0, -30.0]);
        }
        let hist = ColorHistogram::new(&pixels);
        let mut palette = palette(&hist, 2usize.try_into().unwrap());
        palette.sort_by(|a, b| a[0].total_cmp(&b[0]));
        assert!(palette[0][0] < 1.0);
        assert!(palette[1][0] > 99.0);
    }
}
