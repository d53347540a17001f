//! Fast nearest palette color queries.
//!
//! [`PaletteIndex`] is an immutable kd-tree built once over the final palette. Queries
//! return exactly the entry an exhaustive linear scan would return: squared Euclidean
//! distance, ties broken towards the lowest palette index. The tree is purely a
//! performance optimization for the per-pixel assignment pass.

use crate::math::dot;

/// The number of palette entries below which a subtree is stored as a flat leaf.
const LEAF_SIZE: usize = 4;

/// A node of the kd-tree, stored in an arena.
#[derive(Debug, Clone, Copy)]
enum Node {
    /// An inner node splitting space at `split` along `axis`.
    Inner {
        /// The channel this node splits along.
        axis: u8,
        /// The split coordinate; entries left of the boundary are in `left`.
        split: f64,
        /// Arena id of the left child.
        left: u32,
        /// Arena id of the right child.
        right: u32,
    },
    /// A leaf holding a small range of the entry permutation.
    Leaf {
        /// The start of the range (inclusive).
        start: u32,
        /// The end of the range (exclusive).
        end: u32,
    },
}

/// An immutable spatial index over a palette of working space colors.
#[derive(Debug, Clone)]
pub struct PaletteIndex {
    /// The palette colors, in palette order.
    colors: Vec<[f64; 3]>,
    /// A permutation of palette indices grouped by leaf.
    order: Vec<u8>,
    /// The tree arena; index 0 is the root.
    nodes: Vec<Node>,
}

/// The current best candidate of a query.
#[derive(Debug, Clone, Copy)]
struct Best {
    index: u8,
    distance: f64,
}

impl Best {
    /// Accept a candidate if it is strictly closer, or equally close with a lower
    /// palette index.
    #[inline]
    fn visit(&mut self, index: u8, distance: f64) {
        if distance < self.distance || (distance == self.distance && index < self.index) {
            self.index = index;
            self.distance = distance;
        }
    }
}

#[inline]
fn distance_squared(a: [f64; 3], b: [f64; 3]) -> f64 {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    dot(d, d)
}

impl PaletteIndex {
    /// Build a [`PaletteIndex`] over the given palette.
    ///
    /// The palette must be non-empty and at most 256 entries; this is guaranteed for
    /// every palette produced by the builders in this crate.
    #[must_use]
    pub fn new(palette: &[[f64; 3]]) -> Self {
        debug_assert!(!palette.is_empty() && palette.len() <= 256);

        #[allow(clippy::cast_possible_truncation)]
        let mut order: Vec<u8> = (0..palette.len() as u16).map(|i| i as u8).collect();
        let mut nodes = Vec::new();
        build(palette, &mut order, 0, &mut nodes);

        Self {
            colors: palette.to_vec(),
            order,
            nodes,
        }
    }

    /// The number of palette entries in the index.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Returns whether the index is empty. Always false for indices built by [`new`](Self::new).
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Returns the index of the palette entry nearest to `color` by squared Euclidean
    /// distance, with ties broken towards the lowest palette index.
    #[must_use]
    pub fn query(&self, color: [f64; 3]) -> u8 {
        if self.colors.len() == 1 {
            return 0;
        }

        let mut best = Best {
            index: 0,
            distance: f64::INFINITY,
        };
        self.search(0, color, &mut best);
        best.index
    }

    fn search(&self, node: u32, color: [f64; 3], best: &mut Best) {
        match self.nodes[node as usize] {
            Node::Leaf { start, end } => {
                for &i in &self.order[start as usize..end as usize] {
                    best.visit(i, distance_squared(color, self.colors[usize::from(i)]));
                }
            }
            Node::Inner { axis, split, left, right } => {
                let diff = color[usize::from(axis)] - split;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };

                self.search(near, color, best);
                // An equally distant entry may have a lower index, so the far side is
                // pruned only when it is strictly farther than the current best.
                if diff * diff <= best.distance {
                    self.search(far, color, best);
                }
            }
        }
    }

    /// Map every color in a slice to the index of its nearest palette entry.
    #[must_use]
    pub fn assign(&self, colors: &[[f64; 3]]) -> Vec<u8> {
        colors.iter().map(|&color| self.query(color)).collect()
    }
}

/// Recursively build the tree over `order[..]`; returns the id of the created node.
fn build(palette: &[[f64; 3]], order: &mut [u8], offset: u32, nodes: &mut Vec<Node>) -> u32 {
    #[allow(clippy::cast_possible_truncation)]
    let id = nodes.len() as u32;

    if order.len() <= LEAF_SIZE {
        #[allow(clippy::cast_possible_truncation)]
        nodes.push(Node::Leaf {
            start: offset,
            end: offset + order.len() as u32,
        });
        return id;
    }

    // Split along the widest-spread channel at the median entry.
    let axis = widest_axis(palette, order);
    let mid = order.len() / 2;
    let c = usize::from(axis);
    order.select_nth_unstable_by(mid, |&a, &b| {
        palette[usize::from(a)][c]
            .total_cmp(&palette[usize::from(b)][c])
            .then(a.cmp(&b))
    });
    let split = palette[usize::from(order[mid])][c];

    nodes.push(Node::Leaf { start: 0, end: 0 }); // placeholder, patched below

    let (left_order, right_order) = order.split_at_mut(mid);
    let left = build(palette, left_order, offset, nodes);
    #[allow(clippy::cast_possible_truncation)]
    let right = build(palette, right_order, offset + mid as u32, nodes);

    nodes[id as usize] = Node::Inner { axis, split, left, right };
    id
}

/// The channel with the widest min-to-max spread over the given entries.
fn widest_axis(palette: &[[f64; 3]], order: &[u8]) -> u8 {
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for &i in order {
        let color = palette[usize::from(i)];
        for c in 0..3 {
            min[c] = min[c].min(color[c]);
            max[c] = max[c].max(color[c]);
        }
    }

    let mut axis = 0;
    for c in 1..3 {
        if max[c] - min[c] > max[axis] - min[axis] {
            axis = c;
        }
    }
    #[allow(clippy::cast_possible_truncation)]
    {
        axis as u8
    }
}

#[cfg(feature = "threads")]
mod parallel {
    use super::PaletteIndex;
    use rayon::prelude::*;

    impl PaletteIndex {
        /// Map every color in a slice to the index of its nearest palette entry in
        /// parallel.
        #[must_use]
        pub fn assign_par(&self, colors: &[[f64; 3]]) -> Vec<u8> {
            colors.par_iter().map(|&color| self.query(color)).collect()
        }
    }
}

/// The index of the nearest palette entry by exhaustive scan.
///
/// The reference implementation [`PaletteIndex`] must agree with.
#[cfg(test)]
pub(crate) fn linear_scan(palette: &[[f64; 3]], color: [f64; 3]) -> u8 {
    let mut best = Best {
        index: 0,
        distance: f64::INFINITY,
    };
    for (i, &entry) in palette.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        best.visit(i as u8, distance_squared(color, entry));
    }
    best.index
}
