//! Lattice points inside an ellipsoid.
//!
//! With `C` upper triangular, the ellipsoid `{n ∈ ℤ^g : ‖C·n − v‖² ≤ R²}` is
//! enumerated one coordinate at a time starting from the last one, whose row
//! of `C` has a single non-zero entry. Fixing `n_{d-1} = k` leaves an
//! ellipsoid in dimension `d − 1` with offset `v − k·C[·, d−1]` and budget
//! `R² − (c·k − v_{d−1})²`.
//!
//! All intervals are computed over-inclusively from ball bounds, so
//! enlarging `R²` never removes a point. A point is kept unless its
//! distance is certified to exceed `R²`; the excess is at most the radii of
//! the balls involved.

use tracing::trace;

use crate::ball::{Ball, Dyadic};
use crate::error::{Result, ThetaError};
use crate::matrix::BallMat;

/// Largest coordinate the enumerator accepts.
const MAX_COORD: i64 = 1 << 40;

#[derive(Clone, Debug)]
pub struct Ellipsoid {
    dim: usize,
    ambient_dim: usize,
    last_coords: Vec<i64>,
    r2: Dyadic,
    min: i64,
    mid: i64,
    max: i64,
    nb_pts: usize,
    nb_border: usize,
    children: Vec<Ellipsoid>,
}

/// Integer range containing every `k` with `|k − ctr| ≤ rad`, together with
/// the nearest integer to the centre's midpoint.
pub(crate) fn interval(ctr: &Ball, rad: &Dyadic) -> Result<(i64, i64, i64)> {
    let (lo, hi) = match (ctr.lower(), ctr.upper()) {
        (Some(lo), Some(hi)) => (lo.sub(rad), hi.add(rad)),
        _ => {
            return Err(ThetaError::InsufficientPrecision {
                stage: "ellipsoid interval",
                prec: 0,
            })
        }
    };
    let bound = Dyadic::from_int(MAX_COORD);
    if hi > bound || lo < bound.neg() {
        return Err(ThetaError::InvalidParameters(
            "ellipsoid too large to enumerate".to_string(),
        ));
    }
    let to_i64 = |x: num_bigint::BigInt| -> i64 {
        num_traits::ToPrimitive::to_i64(&x).unwrap_or(0)
    };
    let min = to_i64(lo.ceil());
    let max = to_i64(hi.floor());
    let mid = to_i64(ctr.mid().round_nearest());
    Ok((min, mid, max))
}

impl Ellipsoid {
    /// Enumerates `{n : ‖C·n − v‖² ≤ R²}` for an upper triangular `C`.
    pub fn fill(c: &BallMat, r2: &Dyadic, offset: &[Ball], prec: u64) -> Result<Ellipsoid> {
        let g = c.ensure_square()?;
        if offset.len() != g {
            return Err(ThetaError::InvalidDimension {
                expected: g,
                got: offset.len(),
            });
        }
        let e = Self::fill_rec(c, r2, offset, Vec::new(), g, prec)?;
        trace!(dim = g, nb_pts = e.nb_pts, nb_border = e.nb_border, "ellipsoid filled");
        Ok(e)
    }

    fn empty(dim: usize, ambient_dim: usize, last_coords: Vec<i64>, r2: Dyadic) -> Ellipsoid {
        Ellipsoid {
            dim,
            ambient_dim,
            last_coords,
            r2,
            min: 1,
            mid: 0,
            max: 0,
            nb_pts: 0,
            nb_border: 0,
            children: Vec::new(),
        }
    }

    fn fill_rec(
        c: &BallMat,
        r2: &Dyadic,
        offset: &[Ball],
        last_coords: Vec<i64>,
        ambient_dim: usize,
        prec: u64,
    ) -> Result<Ellipsoid> {
        let d = offset.len();
        if r2.is_negative() {
            return Ok(Self::empty(d, ambient_dim, last_coords, r2.clone()));
        }
        if d == 0 {
            let mut e = Self::empty(0, ambient_dim, last_coords, r2.clone());
            e.nb_pts = 1;
            return Ok(e);
        }

        let pivot = &c[(d - 1, d - 1)];
        let ctr = offset[d - 1].div(pivot, prec);
        let half_width = Ball::from_dyadic(r2.clone()).sqrt(prec).div(pivot, prec);
        let rad = half_width.upper().ok_or(ThetaError::InsufficientPrecision {
            stage: "ellipsoid",
            prec,
        })?;
        let (min, mid, max) = interval(&ctr, &rad).map_err(|err| match err {
            ThetaError::InsufficientPrecision { stage, .. } => {
                ThetaError::InsufficientPrecision { stage, prec }
            }
            other => other,
        })?;
        if min > max {
            return Ok(Self::empty(d, ambient_dim, last_coords, r2.clone()));
        }
        if mid < min || mid > max {
            return Err(ThetaError::InconsistentInterval { min, mid, max });
        }

        let mut e = Ellipsoid {
            dim: d,
            ambient_dim,
            last_coords,
            r2: r2.clone(),
            min,
            mid,
            max,
            nb_pts: 0,
            nb_border: 0,
            children: Vec::new(),
        };

        if d == 1 {
            e.nb_pts = (max - min + 1) as usize;
            e.nb_border = 2;
            return Ok(e);
        }

        let r2_ball = Ball::from_dyadic(r2.clone());
        for k in min..=max {
            let kb = Ball::from_int(k);
            let gap = pivot.mul(&kb, prec).sub(&offset[d - 1], prec);
            let rem = r2_ball.sub(&gap.sqr(prec), prec);
            let child_r2 = rem.upper().ok_or(ThetaError::InsufficientPrecision {
                stage: "ellipsoid",
                prec,
            })?;
            let child_offset: Vec<Ball> = (0..d - 1)
                .map(|i| offset[i].sub(&c[(i, d - 1)].mul(&kb, prec), prec))
                .collect();
            let mut coords = Vec::with_capacity(e.last_coords.len() + 1);
            coords.push(k);
            coords.extend_from_slice(&e.last_coords);
            let child = Self::fill_rec(c, &child_r2, &child_offset, coords, ambient_dim, prec)?;
            e.nb_pts += child.nb_pts;
            e.nb_border += child.nb_border;
            e.children.push(child);
        }
        Ok(e)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn ambient_dim(&self) -> usize {
        self.ambient_dim
    }

    pub fn r2(&self) -> &Dyadic {
        &self.r2
    }

    pub fn nb_pts(&self) -> usize {
        self.nb_pts
    }

    pub fn nb_border(&self) -> usize {
        self.nb_border
    }

    /// Range of the last free coordinate, `None` when empty.
    pub fn range(&self) -> Option<(i64, i64, i64)> {
        (self.min <= self.max).then_some((self.min, self.mid, self.max))
    }

    fn full_point(&self, head: &[i64]) -> Vec<i64> {
        let mut p = Vec::with_capacity(self.ambient_dim);
        p.extend_from_slice(head);
        p.extend_from_slice(&self.last_coords);
        p
    }

    /// Every enumerated point, as a vector of length `ambient_dim`. The
    /// iterator borrows the ellipsoid and can be recreated at will.
    pub fn points(&self) -> Box<dyn Iterator<Item = Vec<i64>> + '_> {
        if self.nb_pts == 0 {
            return Box::new(std::iter::empty());
        }
        match self.dim {
            0 => Box::new(std::iter::once(self.full_point(&[]))),
            1 => Box::new((self.min..=self.max).map(move |k| self.full_point(&[k]))),
            _ => Box::new(self.children.iter().flat_map(|child| child.points())),
        }
    }

    /// Neighbours just outside every one-dimensional slice.
    pub fn border(&self) -> Box<dyn Iterator<Item = Vec<i64>> + '_> {
        match self.dim {
            0 => Box::new(std::iter::empty()),
            1 if self.min <= self.max => Box::new(
                [self.min - 1, self.max + 1]
                    .into_iter()
                    .map(move |k| self.full_point(&[k])),
            ),
            1 => Box::new(std::iter::empty()),
            _ => Box::new(self.children.iter().flat_map(|child| child.border())),
        }
    }

    /// Whether `n` (of length `ambient_dim`) was enumerated.
    pub fn contains(&self, n: &[i64]) -> bool {
        if n.len() != self.ambient_dim || self.nb_pts == 0 {
            return false;
        }
        if n[self.dim..] != self.last_coords[..] {
            return false;
        }
        if self.dim == 0 {
            return true;
        }
        let k = n[self.dim - 1];
        if k < self.min || k > self.max {
            return false;
        }
        if self.dim == 1 {
            return true;
        }
        self.children[(k - self.min) as usize].contains(n)
    }

    /// Largest `|n_j|` over the enumerated points, per coordinate.
    pub fn box_bounds(&self) -> Vec<i64> {
        let mut bounds = vec![0; self.ambient_dim];
        for p in self.points() {
            for (b, x) in bounds.iter_mut().zip(&p) {
                *b = (*b).max(x.abs());
            }
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cholesky::eld_cho;
    use crate::distance::dist_pt;
    use crate::matrix::AcbMat;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const PREC: u64 = 128;

    fn brute_force(c: &BallMat, r2: f64, v: &[f64], bound: i64) -> Vec<Vec<i64>> {
        let g = v.len();
        let cf = c.to_f64();
        let mut out = Vec::new();
        let total = (2 * bound + 1).pow(g as u32);
        for idx in 0..total {
            let mut rest = idx;
            let n: Vec<i64> = (0..g)
                .map(|_| {
                    let x = rest % (2 * bound + 1) - bound;
                    rest /= 2 * bound + 1;
                    x
                })
                .collect();
            let d: f64 = (0..g)
                .map(|i| {
                    let s: f64 = (i..g).map(|j| cf[i][j] * n[j] as f64).sum::<f64>() - v[i];
                    s * s
                })
                .sum();
            // stay clear of the boundary so f64 rounding cannot matter
            if d <= r2 * (1.0 - 1e-9) {
                out.push(n);
            }
        }
        out
    }

    #[test]
    fn test_one_dimensional() {
        let c = BallMat::from_f64_rows(&[vec![2.0]]).unwrap();
        let e = Ellipsoid::fill(&c, &Dyadic::from_int(9), &[Ball::from_f64(1.0)], PREC).unwrap();
        // |2n - 1| <= 3  <=>  n in {-1, 0, 1, 2}
        assert_eq!(e.nb_pts(), 4);
        assert_eq!(e.range(), Some((-1, 1, 2)));
        let border: Vec<_> = e.border().collect();
        assert_eq!(border, vec![vec![-2], vec![3]]);
    }

    #[test]
    fn test_negative_budget_is_empty() {
        let c = BallMat::identity(2);
        let e = Ellipsoid::fill(&c, &Dyadic::from_int(-1), &[Ball::zero(), Ball::zero()], PREC).unwrap();
        assert_eq!(e.nb_pts(), 0);
        assert_eq!(e.points().count(), 0);
    }

    #[test]
    fn test_dimension_zero_has_one_point() {
        let e = Ellipsoid::fill(&BallMat::zeros(0, 0), &Dyadic::one(), &[], PREC).unwrap();
        assert_eq!(e.nb_pts(), 1);
        assert_eq!(e.points().next(), Some(vec![]));
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        for g in 1..=3 {
            let tau = AcbMat::random_siegel(g, &mut rng);
            let c = eld_cho(&tau, PREC).unwrap();
            let v: Vec<f64> = (0..g).map(|i| 0.3 * i as f64 - 0.2).collect();
            let vb: Vec<Ball> = v.iter().map(|&x| Ball::from_f64(x)).collect();
            let r2 = 12.0;
            let r2d = Dyadic::from_f64(r2).unwrap();
            let e = Ellipsoid::fill(&c, &r2d, &vb, PREC).unwrap();
            for n in brute_force(&c, r2, &v, 8) {
                assert!(e.contains(&n), "missing point {:?}", n);
            }
            let mut count = 0;
            for n in e.points() {
                count += 1;
                // no enumerated point is certifiably outside
                let d = dist_pt(&vb, &c, &n, PREC);
                assert!(d.lower().unwrap() <= r2d, "point {:?} outside", n);
            }
            assert_eq!(count, e.nb_pts());
            for n in e.border() {
                assert!(!e.contains(&n));
                assert!(dist_pt(&vb, &c, &n, PREC).to_f64() >= r2 * 0.99);
            }
        }
    }

    proptest! {
        #[test]
        fn test_monotone_in_radius(r2 in 0.5f64..20.0, extra in 0.0f64..10.0, v0 in -2.0f64..2.0) {
            let c = BallMat::from_f64_rows(&[vec![1.5, 0.4], vec![0.0, 1.1]]).unwrap();
            let v = [Ball::from_f64(v0), Ball::from_f64(-v0 / 3.0)];
            let small = Ellipsoid::fill(&c, &Dyadic::from_f64(r2).unwrap(), &v, PREC).unwrap();
            let large = Ellipsoid::fill(&c, &Dyadic::from_f64(r2 + extra).unwrap(), &v, PREC).unwrap();
            prop_assert!(large.nb_pts() >= small.nb_pts());
            for n in small.points() {
                prop_assert!(large.contains(&n));
            }
        }
    }
}
