//! The Patolette heuristic: divisive clustering along principal axes.
//!
//! Where [`wu`](crate::wu) restricts itself to axis-aligned cuts, this builder splits the
//! most dispersed cluster with a hyperplane orthogonal to the cluster's principal axis of
//! spread. Member colors are projected onto the axis, bucketed, and the bucket boundary
//! maximizing the between-part objective becomes the cut.
//!
//! The cluster hierarchy is an arena of nodes referenced by index; children partition
//! their parent's histogram mass disjointly and exhaustively, and the leaves of the
//! final hierarchy become the palette.

use crate::{
    ColorHistogram, ColorStats, PaletteSize,
    math::{Covariance, DELTA, dot},
};
use core::cmp::Reverse;
use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;

/// The number of buckets projections are sorted into when searching for a cut.
const BUCKET_COUNT: usize = 512;

/// A node in the binary partition hierarchy.
#[derive(Debug, Clone)]
struct ClusterNode {
    /// The indices of the histogram entries belonging to this cluster.
    members: Vec<u32>,
    /// The aggregated moments of the member entries.
    stats: ColorStats,
    /// Sum of squared deviations of the member colors from the centroid,
    /// weighted by occurrence counts.
    distortion: f64,
    /// The arena ids of the two children once the node has been split.
    children: Option<(u32, u32)>,
}

/// Split a cluster's members in two across its principal axis.
///
/// Returns `None` when the cluster cannot be split: a single member, no spread in any
/// direction, a flat projection, or no boundary leaving mass on both sides.
fn split_members(hist: &ColorHistogram, members: &[u32]) -> Option<(Vec<u32>, Vec<u32>)> {
    if members.len() < 2 {
        return None;
    }

    let colors = hist.colors();
    let counts = hist.counts();

    let cov = Covariance::weighted(colors, counts, members)?;
    let axis = cov.principal_axis()?;

    let projections: Vec<f64> = members
        .iter()
        .map(|&i| dot(colors[i as usize], axis))
        .collect();

    let min = projections.iter().copied().fold(f64::INFINITY, f64::min);
    let max = projections.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max - min < DELTA {
        return None;
    }

    // Bucket sort of the projections; buckets are not internally sorted.
    let scale = 1.0 / (max - min);
    let bucket_map: Vec<usize> = projections
        .iter()
        .map(|&p| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bucket = (BUCKET_COUNT as f64 * (p - min) * scale) as usize;
            bucket.min(BUCKET_COUNT - 1)
        })
        .collect();

    // Cumulative per-bucket weighted sums and sizes.
    let mut sums = [[0.0f64; BUCKET_COUNT]; 3];
    let mut sizes = [0.0f64; BUCKET_COUNT];
    for (&i, &bucket) in members.iter().zip(&bucket_map) {
        let w = f64::from(counts[i as usize]);
        let color = colors[i as usize];
        for c in 0..3 {
            sums[c][bucket] += w * color[c];
        }
        sizes[bucket] += w;
    }
    for i in 1..BUCKET_COUNT {
        for sums in &mut sums {
            sums[i] += sums[i - 1];
        }
        sizes[i] += sizes[i - 1];
    }

    // The objective is maximized over bucket boundaries; the first maximum wins,
    // i.e. the lowest cut position on ties.
    let total_size = sizes[BUCKET_COUNT - 1];
    let mut best: Option<(f64, usize)> = None;
    for i in 0..BUCKET_COUNT - 1 {
        let sl = sizes[i];
        let sr = total_size - sl;
        if sl == 0.0 || sr == 0.0 {
            continue;
        }

        let mut objective = 0.0;
        for sums in &sums {
            let csl = sums[i];
            let csr = sums[BUCKET_COUNT - 1] - csl;
            objective += csl * csl / sl + csr * csr / sr;
        }

        if best.is_none_or(|(best, _)| objective > best) {
            best = Some((objective, i));
        }
    }
    let (_, cut) = best?;

    let mut left = Vec::new();
    let mut right = Vec::new();
    for (&i, &bucket) in members.iter().zip(&bucket_map) {
        if bucket <= cut {
            left.push(i);
        } else {
            right.push(i);
        }
    }
    debug_assert!(!left.is_empty() && !right.is_empty());
    Some((left, right))
}

/// Build a cluster node from its member entries.
fn make_node(hist: &ColorHistogram, members: Vec<u32>) -> ClusterNode {
    let mut stats = ColorStats::ZERO;
    for &i in &members {
        stats += hist.entry_stats(i as usize);
    }
    let distortion = stats.distortion();
    ClusterNode {
        members,
        stats,
        distortion,
        children: None,
    }
}

/// Grow the hierarchy until `k` leaves exist or no node can be split.
fn grow_hierarchy(hist: &ColorHistogram, k: PaletteSize) -> Vec<ClusterNode> {
    #[allow(clippy::cast_possible_truncation)]
    let root = make_node(hist, (0..hist.len() as u32).collect());

    let mut arena = vec![root];
    let mut heap = BinaryHeap::new();
    if arena[0].distortion >= DELTA {
        heap.push((OrderedFloat(arena[0].distortion), Reverse(0usize)));
    }

    let mut leaves = 1;
    while leaves < k.as_usize() {
        let Some((_, Reverse(id))) = heap.pop() else {
            // every remaining leaf is unsplittable
            break;
        };

        let Some((left, right)) = split_members(hist, &arena[id].members) else {
            continue;
        };

        #[allow(clippy::cast_possible_truncation)]
        let left_id = arena.len() as u32;
        let right_id = left_id + 1;
        arena[id].children = Some((left_id, right_id));
        arena[id].members = Vec::new();

        for members in [left, right] {
            let node = make_node(hist, members);
            if node.distortion >= DELTA {
                heap.push((OrderedFloat(node.distortion), Reverse(arena.len())));
            }
            arena.push(node);
        }

        leaves += 1;
    }

    arena
}

/// Compute a palette of at most `k` working space colors from a histogram.
///
/// `min(k, distinct colors)` is a target rather than a guarantee: splitting stops early
/// when no remaining cluster admits a separating hyperplane.
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

    let arena = grow_hierarchy(hist, k);

    let mut palette: Vec<[f64; 3]> = Vec::new();
    let mut counts: Vec<u32> = Vec::new();
    for node in arena.iter().filter(|node| node.children.is_none()) {
        let centroid = node.stats.centroid();
        // Exact duplicates are merged rather than emitted twice; palette entries
        // must be pairwise distinct.
        if let Some(existing) = palette.iter().position(|&c| c == centroid) {
            counts[existing] += node.stats.count;
        } else {
            palette.push(centroid);
            counts.push(node.stats.count);
        }
    }
    (palette, counts)
}
