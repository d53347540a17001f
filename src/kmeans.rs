//! Palette refinement by weighted batch k-means.
//!
//! The divisive builders produce good palettes, but a few Lloyd iterations seeded with
//! their centroids consistently lower the total quantization error. Iterations run over
//! the histogram entries weighted by occurrence counts, so cost scales with the number
//! of unique colors rather than pixels. Assignment uses the same
//! [`PaletteIndex`](crate::PaletteIndex) the final mapping pass uses; the whole procedure
//! is deterministic.

use crate::{ColorHistogram, PaletteIndex};

/// Options for palette refinement.
///
/// # Examples
///
/// ```
/// # use patolette::kmeans::Refinement;
/// let refinement = Refinement::new().iterations(4);
/// ```
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Refinement {
    /// The number of Lloyd iterations to run.
    iterations: u32,
}

impl Refinement {
    /// Create a new [`Refinement`] with the default number of iterations.
    #[inline]
    pub const fn new() -> Self {
        Self { iterations: 8 }
    }

    /// Sets the number of Lloyd iterations to run.
    ///
    /// The default is `8`. Zero iterations leave the palette unchanged.
    #[inline]
    pub const fn iterations(self, iterations: u32) -> Self {
        Self { iterations }
    }
}

impl Default for Refinement {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Refine a palette of working space centroids against a histogram.
///
/// Each iteration assigns every histogram entry to its nearest centroid and moves each
/// centroid to the weighted mean of its assigned entries. A centroid that ends up with
/// no entries keeps its previous value. Returns the refined palette together with the
/// histogram mass assigned to each centroid; exact duplicate centroids are merged.
#[must_use]
pub fn refine(
    hist: &ColorHistogram,
    palette: Vec<[f64; 3]>,
    options: Refinement,
) -> (Vec<[f64; 3]>, Vec<u32>) {
    let mut palette = palette;
    let mut counts = vec![0u32; palette.len()];

    if palette.is_empty() || hist.is_empty() {
        return (palette, counts);
    }

    for _ in 0..options.iterations {
        let index = PaletteIndex::new(&palette);

        let mut sums: Vec<[f64; 3]> = bytemuck::zeroed_vec(palette.len());
        let mut weights = vec![0.0f64; palette.len()];
        for (&color, &count) in hist.colors().iter().zip(hist.counts()) {
            let nearest = usize::from(index.query(color));
            let w = f64::from(count);
            for c in 0..3 {
                sums[nearest][c] += w * color[c];
            }
            weights[nearest] += w;
        }

        for ((centroid, sum), &weight) in palette.iter_mut().zip(&sums).zip(&weights) {
            if weight > 0.0 {
                *centroid = core::array::from_fn(|c| sum[c] / weight);
            }
        }
    }

    // Final assignment for the returned masses.
    let index = PaletteIndex::new(&palette);
    for (&color, &count) in hist.colors().iter().zip(hist.counts()) {
        counts[usize::from(index.query(color))] += count;
    }

    merge_duplicates(palette, counts)
}

/// Merge exact duplicate centroids, summing their masses.
fn merge_duplicates(palette: Vec<[f64; 3]>, counts: Vec<u32>) -> (Vec<[f64; 3]>, Vec<u32>) {
    let mut merged: Vec<[f64; 3]> = Vec::with_capacity(palette.len());
    let mut merged_counts: Vec<u32> = Vec::with_capacity(counts.len());
    for (color, count) in palette.into_iter().zip(counts) {
        if let Some(existing) = merged.iter().position(|&c| c == color) {
            merged_counts[existing] += count;
        } else {
            merged.push(color);
            merged_counts.push(count);
        }
    }
    (merged, merged_counts)
}
