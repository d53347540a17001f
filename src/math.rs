//! Principal component analysis over weighted color sets.
//!
//! Only the dominant eigenvector of a 3x3 covariance matrix is ever needed, so the
//! solver is a plain power iteration with a deterministic starting vector.

/// Numerical tolerance below which spreads and variances are treated as zero.
pub(crate) const DELTA: f64 = 1e-8;

/// A symmetric 3x3 variance-covariance matrix stored as its lower triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Covariance {
    /// [c00, c01, c02, c11, c12, c22]
    elems: [f64; 6],
}

impl Covariance {
    /// The count-weighted covariance of the given colors.
    ///
    /// Returns `None` when the total weight is zero.
    pub(crate) fn weighted(colors: &[[f64; 3]], weights: &[u32], members: &[u32]) -> Option<Self> {
        let mut total = 0.0;
        let mut mean = [0.0; 3];
        for &i in members {
            let w = f64::from(weights[i as usize]);
            let color = colors[i as usize];
            total += w;
            for c in 0..3 {
                mean[c] += w * color[c];
            }
        }
        if total == 0.0 {
            return None;
        }
        for c in &mut mean {
            *c /= total;
        }

        let mut elems = [0.0; 6];
        for &i in members {
            let w = f64::from(weights[i as usize]);
            let color = colors[i as usize];
            let d: [f64; 3] = core::array::from_fn(|c| color[c] - mean[c]);
            elems[0] += w * d[0] * d[0];
            elems[1] += w * d[0] * d[1];
            elems[2] += w * d[0] * d[2];
            elems[3] += w * d[1] * d[1];
            elems[4] += w * d[1] * d[2];
            elems[5] += w * d[2] * d[2];
        }
        for e in &mut elems {
            *e /= total;
        }

        Some(Self { elems })
    }

    #[inline]
    fn apply(&self, v: [f64; 3]) -> [f64; 3] {
        let [c00, c01, c02, c11, c12, c22] = self.elems;
        [
            c00 * v[0] + c01 * v[1] + c02 * v[2],
            c01 * v[0] + c11 * v[1] + c12 * v[2],
            c02 * v[0] + c12 * v[1] + c22 * v[2],
        ]
    }

    /// The eigenvector belonging to the largest eigenvalue, computed by power iteration.
    ///
    /// Returns `None` when the matrix is (numerically) zero, i.e. the color set has no
    /// spread in any direction.
    pub(crate) fn principal_axis(&self) -> Option<[f64; 3]> {
        if self.elems.iter().all(|e| e.abs() < DELTA * DELTA) {
            return None;
        }

        // A fixed starting vector keeps the result deterministic. The axis-aligned
        // fallbacks cover starts that happen to be orthogonal to the dominant axis.
        for start in [
            [1.0, 1.0, 1.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ] {
            if let Some(axis) = self.power_iterate(start) {
                return Some(axis);
            }
        }
        None
    }

    fn power_iterate(&self, start: [f64; 3]) -> Option<[f64; 3]> {
        let mut v = normalize(start)?;
        for _ in 0..64 {
            let next = self.apply(v);
            let Some(next) = normalize(next) else {
                return None;
            };
            let diff = norm([next[0] - v[0], next[1] - v[1], next[2] - v[2]]);
            v = next;
            if diff < 1e-12 {
                break;
            }
        }

        // Reject a fixed point with a vanishing Rayleigh quotient: the iteration
        // stalled instead of converging to a spread direction.
        let quotient = dot(v, self.apply(v));
        (quotient > DELTA * DELTA).then_some(v)
    }
}

#[inline]
pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn norm(v: [f64; 3]) -> f64 {
    dot(v, v).sqrt()
}

#[inline]
fn normalize(v: [f64; 3]) -> Option<[f64; 3]> {
    let n = norm(v);
    (n > 0.0).then(|| v.map(|c| c / n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_angle_close(a: [f64; 3], b: [f64; 3]) -> bool {
        // Eigenvectors are defined up to sign.
        dot(a, b).abs() > 1.0 - 1e-6
    }

    #[test]
    fn recovers_dominant_axis() {
        // Points spread along (1, 2, -1) with small noise in other directions.
        let dir = [1.0, 2.0, -1.0];
        let colors: Vec<[f64; 3]> = (0..50)
            .map(|i| {
                let t = f64::from(i) - 25.0;
                let jitter = f64::from(i % 3) * 0.01;
                [dir[0] * t + jitter, dir[1] * t, dir[2] * t - jitter]
            })
            .collect();
        let weights = vec![1u32; colors.len()];
        let members: Vec<u32> = (0..colors.len() as u32).collect();

        let cov = Covariance::weighted(&colors, &weights, &members).unwrap();
        let axis = cov.principal_axis().unwrap();
        let expected = normalize(dir).unwrap();
        assert!(axis_angle_close(axis, expected), "axis = {axis:?}");
    }

    #[test]
    fn zero_spread_has_no_axis() {
        let colors = vec![[0.3, 0.3, 0.3]; 10];
        let weights = vec![7u32; colors.len()];
        let members: Vec<u32> = (0..colors.len() as u32).collect();

        let cov = Covariance::weighted(&colors, &weights, &members).unwrap();
        assert_eq!(cov.principal_axis(), None);
    }

    #[test]
    fn weights_shift_the_axis() {
        // Heavily weighted points along x dominate an unweighted spread along y.
        let colors = vec![
            [-1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let weights = vec![100, 100, 1, 1];
        let members: Vec<u32> = (0..4).collect();

        let cov = Covariance::weighted(&colors, &weights, &members).unwrap();
        let axis = cov.principal_axis().unwrap();
        assert!(axis_angle_close(axis, [1.0, 0.0, 0.0]), "axis = {axis:?}");
    }
}
