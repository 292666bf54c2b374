//! Squared distances between a point and lattice cosets, measured with the
//! Cholesky factor of `π·Im τ`.

use crate::ball::{Acb, Ball, Dyadic};
use crate::characteristic::get_slong;
use crate::cholesky::eld_cho;
use crate::ellipsoid::{interval, Ellipsoid};
use crate::error::{Result, ThetaError};
use crate::matrix::{AcbMat, BallMat};

/// `‖C·n − v‖²`.
pub fn dist_pt(v: &[Ball], c: &BallMat, n: &[i64], prec: u64) -> Ball {
    let g = v.len();
    (0..g).fold(Ball::zero(), |acc, i| {
        let row = (i..g).fold(v[i].neg(), |s, j| s.add(&c[(i, j)].mul_si(n[j], prec), prec));
        acc.add(&row.sqr(prec), prec)
    })
}

/// Nearest-plane rounding: the lattice point obtained by rounding each
/// coordinate centre from the last one down.
pub(crate) fn nearest_plane(v: &[Ball], c: &BallMat, prec: u64) -> Result<Vec<i64>> {
    let g = v.len();
    let mut n = vec![0i64; g];
    let mut w = v.to_vec();
    for d in (0..g).rev() {
        let ctr = w[d].div(&c[(d, d)], prec);
        let (_, mid, _) = interval(&ctr, &Dyadic::zero()).map_err(|err| match err {
            ThetaError::InsufficientPrecision { stage, .. } => {
                ThetaError::InsufficientPrecision { stage, prec }
            }
            other => other,
        })?;
        n[d] = mid;
        for (i, wi) in w.iter_mut().enumerate().take(d) {
            *wi = wi.sub(&c[(i, d)].mul_si(mid, prec), prec);
        }
    }
    Ok(n)
}

/// `min_n ‖C·n − v‖²` over `n ∈ ℤ^g`.
///
/// The nearest-plane point gives an upper bound `u`; the minimum is then
/// taken over the ellipsoid of radius `u`, which always contains that point.
pub fn sqr_dist(v: &[Ball], c: &BallMat, prec: u64) -> Result<Ball> {
    let g = c.ensure_square()?;
    if v.len() != g {
        return Err(ThetaError::InvalidDimension {
            expected: g,
            got: v.len(),
        });
    }
    let n0 = nearest_plane(v, c, prec)?;
    let bound = dist_pt(v, c, &n0, prec)
        .upper()
        .ok_or(ThetaError::InsufficientPrecision {
            stage: "lattice distance",
            prec,
        })?;
    let e = Ellipsoid::fill(c, &bound, v, prec)?;
    let mut best: Option<(Dyadic, Dyadic)> = None;
    for n in e.points() {
        let d = dist_pt(v, c, &n, prec);
        let (lo, hi) = match (d.lower(), d.upper()) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => continue,
        };
        best = Some(match best {
            None => (lo, hi),
            Some((blo, bhi)) => (Ord::min(blo, lo), Ord::min(bhi, hi)),
        });
    }
    let (lo, hi) = best.ok_or(ThetaError::InsufficientPrecision {
        stage: "lattice distance",
        prec,
    })?;
    // squared distances are nonnegative
    let lo = Ord::max(lo, Dyadic::zero());
    Ok(Ball::from_interval(&lo, &hi, prec))
}

/// Offset `v = −C·Y⁻¹·Im z`, so that `|exp(πi nᵗτn + 2πi nᵗz)| =
/// exp(−‖C·n − v‖²)·exp(π·yᵗY⁻¹y)`.
pub(crate) fn offset(z: &[Acb], c: &BallMat, yinv: &BallMat, prec: u64) -> Vec<Ball> {
    let y: Vec<Ball> = z.iter().map(|x| x.im().clone()).collect();
    let w = yinv.mul_vec(&y, prec);
    c.mul_vec(&w, prec).iter().map(Ball::neg).collect()
}

/// For each `a ∈ {0,1}^g`, the squared distance from the offset of `z` to
/// the shifted lattice `C·(ℤ^g + a/2)`. Up to the common factor
/// `exp(π·yᵗY⁻¹y)`, `exp(−d_a)` is the size of the largest term of
/// `θ_{a,0}(z, τ)`.
pub fn dist_a0(z: &[Acb], tau: &AcbMat, prec: u64) -> Result<Vec<Ball>> {
    let g = tau.ensure_square()?;
    if z.len() != g {
        return Err(ThetaError::InvalidDimension {
            expected: g,
            got: z.len(),
        });
    }
    let c = eld_cho(tau, prec)?;
    let yinv = tau
        .imag_part()
        .inv(prec)
        .ok_or(ThetaError::InsufficientPrecision {
            stage: "imaginary part inverse",
            prec,
        })?;
    let v = offset(z, &c, &yinv, prec);

    (0..1u64 << g)
        .map(|a| {
            let half: Vec<Ball> = get_slong(a, g)
                .into_iter()
                .map(|x| Ball::from_int(x).mul_2exp(-1))
                .collect();
            let shift = c.mul_vec(&half, prec);
            let w: Vec<Ball> = v.iter().zip(&shift).map(|(x, s)| x.sub(s, prec)).collect();
            sqr_dist(&w, &c, prec)
        })
        .collect()
}
