//! Side-of-bisector classification with a certified adaptive path.
//!
//! Clipping a cell by the perpendicular bisector of two generators reduces
//! every topological decision to the sign of
//! `d(v) = (|v - p|^2 - |v - q|^2) / 2`. The fast path evaluates this in
//! plain floating point. The adaptive path (the exact-predicates toggle,
//! default on) re-evaluates near-zero results with FMA-compensated
//! arithmetic and a forward error bound; values inside the bound classify
//! as exactly on the plane, so near-degenerate generator configurations
//! cannot flip a vertex to inconsistent sides in different clips.

/// Evaluation mode for bisector classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Predicates {
    exact: bool,
}

impl Predicates {
    pub fn new(exact: bool) -> Self {
        Self { exact }
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }
}

/// Perpendicular bisector of the segment from `p` to `q`, oriented so that
/// side values are positive on the `q` half-space.
#[derive(Clone, Copy, Debug)]
pub struct Bisector {
    pub p: [f64; 3],
    pub q: [f64; 3],
    mid: [f64; 3],
    normal: [f64; 3],
}

impl Bisector {
    pub fn new(p: [f64; 3], q: [f64; 3]) -> Self {
        Self {
            p,
            q,
            mid: [
                0.5 * (p[0] + q[0]),
                0.5 * (p[1] + q[1]),
                0.5 * (p[2] + q[2]),
            ],
            normal: [q[0] - p[0], q[1] - p[1], q[2] - p[2]],
        }
    }

    /// Plain floating-point side value: positive when `v` is closer to `q`,
    /// negative when closer to `p`.
    pub fn value(&self, v: &[f64]) -> f64 {
        (v[0] - self.mid[0]) * self.normal[0]
            + (v[1] - self.mid[1]) * self.normal[1]
            + (v[2] - self.mid[2]) * self.normal[2]
    }

    /// Side value under the given evaluation mode. In adaptive mode a result
    /// whose magnitude cannot be certified is snapped to exactly 0.0, which
    /// downstream clipping treats as on-plane.
    pub fn side(&self, v: &[f64], predicates: Predicates) -> f64 {
        if !predicates.exact {
            return self.value(v);
        }

        let terms = self.product_terms(v);

        let mut d = 0.0;
        let mut mag = 0.0;
        for &(a, b) in &terms {
            let t = a * b;
            d += t;
            mag += t.abs();
        }
        // Forward error of a 12-term product sum stays well under this.
        let filter = 16.0 * f64::EPSILON * mag;
        if d.abs() > filter {
            return d;
        }

        // Refine: exact products via FMA, compensated summation.
        let mut sum = 0.0;
        let mut comp = 0.0;
        for &(a, b) in &terms {
            let hi = a * b;
            let lo = a.mul_add(b, -hi);
            let t = sum + hi;
            if sum.abs() >= hi.abs() {
                comp += (sum - t) + hi;
            } else {
                comp += (hi - t) + sum;
            }
            sum = t;
            comp += lo;
        }
        let refined = sum + comp;
        // Worst-case compensated-summation error over 24 exact halves.
        let bound = 1024.0 * f64::EPSILON * f64::EPSILON * mag;
        if refined.abs() > bound { refined } else { 0.0 }
    }

    /// The exact-input product terms of
    /// `v . (q - p) - (|q|^2 - |p|^2) / 2`. Halving is exact.
    fn product_terms(&self, v: &[f64]) -> [(f64, f64); 12] {
        let p = &self.p;
        let q = &self.q;
        [
            (v[0], q[0]),
            (-v[0], p[0]),
            (v[1], q[1]),
            (-v[1], p[1]),
            (v[2], q[2]),
            (-v[2], p[2]),
            (-0.5 * q[0], q[0]),
            (0.5 * p[0], p[0]),
            (-0.5 * q[1], q[1]),
            (0.5 * p[1], p[1]),
            (-0.5 * q[2], q[2]),
            (0.5 * p[2], p[2]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_signs() {
        let b = Bisector::new([0.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        let pred = Predicates::new(true);
        assert!(b.side(&[0.2, 5.0, -1.0], pred) < 0.0);
        assert!(b.side(&[1.7, 5.0, -1.0], pred) > 0.0);
        assert_eq!(b.side(&[1.0, 3.0, 4.0], pred), 0.0);
    }

    #[test]
    fn test_fast_matches_adaptive_away_from_plane() {
        let b = Bisector::new([0.3, -1.2, 4.0], [5.1, 2.2, -0.7]);
        let exact = Predicates::new(true);
        let fast = Predicates::new(false);
        let v = [3.0, 0.5, 1.0];
        let de = b.side(&v, exact);
        let df = b.side(&v, fast);
        assert!((de - df).abs() < 1e-9 * de.abs().max(1.0));
        assert_eq!(de > 0.0, df > 0.0);
    }

    #[test]
    fn test_near_tie_snaps_to_zero() {
        // v lies on the bisector up to one ulp of wobble.
        let p = [1.0, 1.0, 1.0];
        let q = [3.0, 1.0, 1.0];
        let b = Bisector::new(p, q);
        let pred = Predicates::new(true);
        let v = [2.0 + f64::EPSILON, 7.0, -3.0];
        let d = b.side(&v, pred);
        // Either exactly classified positive or snapped on-plane; what must
        // not happen is a spurious large value.
        assert!(d.abs() <= 4.0 * f64::EPSILON * 7.0 * 7.0 || d == 0.0);
    }

    #[test]
    fn test_antisymmetry() {
        let p = [0.1, 0.2, 0.3];
        let q = [4.0, -2.0, 1.5];
        let v = [1.0, 1.0, 1.0];
        let pred = Predicates::new(true);
        let a = Bisector::new(p, q).side(&v, pred);
        let b = Bisector::new(q, p).side(&v, pred);
        assert!((a + b).abs() <= 1e-12 * a.abs().max(1.0));
    }
}
