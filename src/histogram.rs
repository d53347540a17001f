//! Aggregation of working space pixels into a compact color histogram.
//!
//! The histogram is the only structure the palette builders see: a deduplicated list of
//! unique colors with their occurrence counts. Per-entry channel moments are derived from
//! the color and count through [`ColorStats`], which is the moment currency shared by the
//! [`wu`](crate::wu) and [`cluster`](crate::cluster) builders.

use bytemuck::Zeroable;
use core::ops::{Add, AddAssign, Sub};
use ordered_float::OrderedFloat;

/// Per-channel first and second moments of a set of weighted colors.
///
/// Supports `+`/`-`/`+=` so that box and cluster moments can be combined and split
/// without rescanning pixels.
#[derive(Debug, Clone, Copy, PartialEq, Zeroable)]
pub struct ColorStats {
    /// The number of pixels aggregated into these stats.
    pub count: u32,
    /// The component-wise sum of the aggregated colors.
    pub sum: [f64; 3],
    /// The component-wise sum of the squared components of the aggregated colors.
    pub sum2: [f64; 3],
}

impl ColorStats {
    /// The all-zero stats.
    pub const ZERO: Self = Self {
        count: 0,
        sum: [0.0; 3],
        sum2: [0.0; 3],
    };

    /// The moments of a unique color occurring `count` times.
    #[must_use]
    #[inline]
    pub fn from_color_count(color: [f64; 3], count: u32) -> Self {
        let w = f64::from(count);
        Self {
            count,
            sum: color.map(|c| w * c),
            sum2: color.map(|c| w * c * c),
        }
    }

    /// The mean color described by these stats.
    #[must_use]
    #[inline]
    pub fn centroid(&self) -> [f64; 3] {
        debug_assert!(self.count > 0);
        let n = f64::from(self.count);
        self.sum.map(|s| s / n)
    }

    /// The sum of squared deviations from the centroid, i.e. the size-weighted variance.
    #[must_use]
    #[inline]
    pub fn distortion(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = f64::from(self.count);
        let mut distortion = 0.0;
        for c in 0..3 {
            distortion += self.sum2[c] - self.sum[c] * self.sum[c] / n;
        }
        // Guards against tiny negative values from catastrophic cancellation.
        distortion.max(0.0)
    }

    /// The sum over channels of the squared component sums divided by the count.
    ///
    /// This is the between-part objective both palette builders maximize when
    /// evaluating a split.
    #[must_use]
    #[inline]
    pub fn weighted_square_sum(&self) -> f64 {
        debug_assert!(self.count > 0);
        let n = f64::from(self.count);
        let mut sum = 0.0;
        for c in 0..3 {
            sum += self.sum[c] * self.sum[c] / n;
        }
        sum
    }
}

impl Add for ColorStats {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            count: self.count + rhs.count,
            sum: core::array::from_fn(|i| self.sum[i] + rhs.sum[i]),
            sum2: core::array::from_fn(|i| self.sum2[i] + rhs.sum2[i]),
        }
    }
}

impl Sub for ColorStats {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            count: self.count - rhs.count,
            sum: core::array::from_fn(|i| self.sum[i] - rhs.sum[i]),
            sum2: core::array::from_fn(|i| self.sum2[i] - rhs.sum2[i]),
        }
    }
}

impl AddAssign for ColorStats {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// The set of unique working space colors in an image with their occurrence counts.
///
/// Entries are kept sorted by channel value so that iteration order, and therefore every
/// downstream palette, is deterministic. The sum of all counts equals the pixel count.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorHistogram {
    /// The unique colors, sorted by channel-wise total order.
    colors: Vec<[f64; 3]>,
    /// The occurrence count of each unique color.
    counts: Vec<u32>,
    /// The total number of aggregated pixels.
    total: u32,
}

/// A sort key establishing a channel-wise total order over colors.
///
/// Negative zero is collapsed to positive zero first so that `-0.0` and `0.0`
/// deduplicate into a single entry.
#[inline]
fn sort_key(color: [f64; 3]) -> [OrderedFloat<f64>; 3] {
    color.map(|c| OrderedFloat(c + 0.0))
}

/// Deduplicate a sorted run of colors into `colors`/`counts`.
fn dedup_sorted_into(sorted: &[[f64; 3]], colors: &mut Vec<[f64; 3]>, counts: &mut Vec<u32>) {
    let mut iter = sorted.iter();
    let Some(&first) = iter.next() else {
        return;
    };

    let mut current = first;
    let mut count = 1u32;
    for &color in iter {
        if sort_key(color) == sort_key(current) {
            count += 1;
        } else {
            colors.push(current);
            counts.push(count);
            current = color;
            count = 1;
        }
    }
    colors.push(current);
    counts.push(count);
}

impl ColorHistogram {
    /// Aggregate a slice of working space pixels into a [`ColorHistogram`].
    ///
    /// Runs in `O(n log n)` via sorting; no pairwise comparisons.
    #[allow(clippy::cast_possible_truncation)] // pixel count is bounded by MAX_PIXELS
    #[must_use]
    pub fn new(pixels: &[[f64; 3]]) -> Self {
        let mut sorted = pixels.to_vec();
        sorted.sort_unstable_by_key(|&color| sort_key(color));

        let mut colors = Vec::new();
        let mut counts = Vec::new();
        dedup_sorted_into(&sorted, &mut colors, &mut counts);

        Self {
            colors,
            counts,
            total: pixels.len() as u32,
        }
    }

    /// The number of unique colors.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Returns whether the histogram contains no colors.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The unique colors, sorted by channel value.
    #[must_use]
    #[inline]
    pub fn colors(&self) -> &[[f64; 3]] {
        &self.colors
    }

    /// The occurrence count of each unique color.
    #[must_use]
    #[inline]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// The total number of aggregated pixels.
    #[must_use]
    #[inline]
    pub fn total_count(&self) -> u32 {
        self.total
    }

    /// The moments of the entry at `index`.
    #[must_use]
    #[inline]
    pub fn entry_stats(&self, index: usize) -> ColorStats {
        ColorStats::from_color_count(self.colors[index], self.counts[index])
    }

    /// The moments of the whole histogram.
    #[must_use]
    pub fn stats(&self) -> ColorStats {
        let mut stats = ColorStats::ZERO;
        for i in 0..self.len() {
            stats += self.entry_stats(i);
        }
        stats
    }
}

#[cfg(feature = "threads")]
mod parallel {
    use super::{ColorHistogram, sort_key};
    use rayon::prelude::*;

    /// Merge two histograms with disjoint pixel sets by merging their sorted entry runs.
    ///
    /// Counts of equal colors are summed; commutative and associative, so the merge
    /// order of shards is irrelevant.
    fn merge(a: ColorHistogram, b: ColorHistogram) -> ColorHistogram {
        let mut colors = Vec::with_capacity(a.colors.len() + b.colors.len());
        let mut counts = Vec::with_capacity(a.counts.len() + b.counts.len());

        let mut left = a.colors.iter().copied().zip(a.counts.iter().copied()).peekable();
        let mut right = b.colors.iter().copied().zip(b.counts.iter().copied()).peekable();

        while let (Some(&(lc, ln)), Some(&(rc, rn))) = (left.peek(), right.peek()) {
            match sort_key(lc).cmp(&sort_key(rc)) {
                core::cmp::Ordering::Less => {
                    colors.push(lc);
                    counts.push(ln);
                    left.next();
                }
                core::cmp::Ordering::Greater => {
                    colors.push(rc);
                    counts.push(rn);
                    right.next();
                }
                core::cmp::Ordering::Equal => {
                    colors.push(lc);
                    counts.push(ln + rn);
                    left.next();
                    right.next();
                }
            }
        }
        for (color, count) in left.chain(right) {
            colors.push(color);
            counts.push(count);
        }

        ColorHistogram {
            colors,
            counts,
            total: a.total + b.total,
        }
    }

    impl ColorHistogram {
        /// Aggregate a slice of working space pixels into a [`ColorHistogram`] in parallel.
        ///
        /// Produces the same histogram as [`ColorHistogram::new`].
        #[must_use]
        pub fn new_par(pixels: &[[f64; 3]]) -> Self {
            let chunk_size = pixels.len().div_ceil(rayon::current_num_threads()).max(1);
            pixels
                .par_chunks(chunk_size)
                .map(ColorHistogram::new)
                .reduce_with(merge)
                .unwrap_or_else(|| ColorHistogram::new(&[]))
        }
    }
}
