use tracing::trace;

use crate::ball::{exp, pi, Ball, Dyadic, Mag};
use crate::error::{Result, ThetaError};
use crate::matrix::BallMat;

/// Precision used for the bound itself.
const BOUND_PREC: u64 = 64;

/// Upper bound on `Σ ‖C·n − v‖^p exp(−‖C·n − v‖²)` over the lattice points
/// outside the ellipsoid of squared radius `R²`, for any offset `v`:
///
/// `2^{2g+2} R^{g−1+p} e^{−R²} Π_j (1 + √π / (R γ_j))`,
///
/// where `γ_j` is the diagonal of `C`. Valid for `R² ≥ max(4, p)`; smaller
/// radii give an infinite bound.
pub fn tail_bound(r2: &Dyadic, c: &BallMat, ord: u32) -> Mag {
    let g = c.rows();
    let floor = Dyadic::from_int(i64::from(ord.max(4)));
    if *r2 < floor {
        return Mag::inf();
    }
    let p = BOUND_PREC;
    let r2 = Ball::from_dyadic(r2.clone());
    let r = r2.sqrt(p);
    let sqrt_pi = pi(p).sqrt(p);

    let mut bound = exp(&r2.neg(), p).mul_2exp(2 * g as i64 + 2);
    let power = g as i64 - 1 + i64::from(ord);
    if power >= 0 {
        bound = bound.mul(&r.pow_ui(power as u64, p), p);
    } else {
        bound = bound.div(&r, p);
    }
    for j in 0..g {
        let gamma = &c[(j, j)];
        if !gamma.is_positive() {
            return Mag::inf();
        }
        let factor = Ball::one().add(&sqrt_pi.div(&r.mul(gamma, p), p), p);
        bound = bound.mul(&factor, p);
    }
    bound.mag_upper()
}

/// Smallest convenient `R²` whose tail bound is below `2^-prec`, together
/// with that bound.
pub fn naive_radius(c: &BallMat, ord: u32, prec: u64) -> Result<(Dyadic, Mag)> {
    let target = Mag::pow2(-(prec as i64));
    let start = (prec as f64 * std::f64::consts::LN_2).ceil() as i64;
    let mut r2 = start.max(4).max(i64::from(ord));
    for _ in 0..64 {
        let r2d = Dyadic::from_int(r2);
        let eps = tail_bound(&r2d, c, ord);
        if eps.is_inf() {
            break;
        }
        if eps <= target {
            trace!(r2, prec, ord, "naive radius");
            return Ok((r2d, eps));
        }
        // each unit of R² gains about log2(e) bits
        let gap = (eps.log2_ceil() + prec as i64).max(1);
        r2 += (gap as f64 * std::f64::consts::LN_2).ceil() as i64;
    }
    Err(ThetaError::InsufficientPrecision {
        stage: "naive radius",
        prec,
    })
}
