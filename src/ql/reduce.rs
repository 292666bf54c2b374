use tracing::debug;

use crate::ball::{exp_pi_i, Acb, Ball, Dyadic, Mag};
use crate::characteristic::get_a;
use crate::cholesky::eld_cho;
use crate::ellipsoid::Ellipsoid;
use crate::error::{Result, ThetaError};
use crate::matrix::AcbMat;
use crate::naive::{naive_radius, naive_reduce};

/// Outcome of splitting off the coordinates along which at most one lattice
/// point of any coset matters.
#[derive(Clone, Debug)]
pub struct QlReduced {
    /// Number of remaining coordinates, or `None` when every `θ_{a,0}(z)`
    /// is below the error bound.
    pub s: Option<usize>,
    /// Reduced point for the remaining coordinates, length `s`.
    pub new_z: Vec<Acb>,
    pub c: Acb,
    /// Absolute error bound, to be scaled by `|c|`.
    pub u: Mag,
    /// Parities of the split-off coordinates of the surviving coset.
    pub a1: u64,
}

/// With `C` the Cholesky factor and `R²` the naive radius at `prec`, the
/// trailing coordinates whose diagonal entry exceeds `4R` each admit at
/// most one half-integer value inside the ellipsoid. Then for `a = (a0, a1)`
///
/// `θ_{a,0}(z, τ) = c·θ_{a0,0}(z0', τ0) ± |c|·u`
///
/// where `τ0` is the leading `s × s` block, and every other `a1` gives
/// `0 ± |c|·u`.
pub fn ql_reduce(z: &[Acb], tau: &AcbMat, prec: u64) -> Result<QlReduced> {
    let g = tau.ensure_square()?;
    let c = eld_cho(tau, prec)?;
    let yinv = tau
        .imag_part()
        .inv(prec)
        .ok_or(ThetaError::InsufficientPrecision {
            stage: "imaginary part inverse",
            prec,
        })?;
    let (r2, eps) = naive_radius(&c, 0, prec)?;
    let reduced = naive_reduce(z, tau, &c, &yinv, prec)?;
    let u = reduced.u.mul(&eps);
    let mut new_z = reduced.z;
    let mut factor = reduced.c;

    let bound = Ball::from_dyadic(r2.clone()).sqrt(prec).mul_2exp(2);
    let mut s = g;
    while s > 0 && c[(s - 1, s - 1)].gt(&bound) {
        s -= 1;
    }
    if s == g {
        return Ok(QlReduced {
            s: Some(g),
            new_z,
            c: factor,
            u: Mag::zero(),
            a1: 0,
        });
    }

    // doubled coordinates m = 2n turn every coset into plain ℤ^(g-s)
    let d = g - s;
    let c1 = c.view(s, s, d, d).to_matrix();
    let v1: Vec<Ball> = reduced.offset[s..].iter().map(|x| x.mul_2exp(1)).collect();
    let e = Ellipsoid::fill(&c1, &r2.mul_2exp(2), &v1, prec)?;
    debug!(g, s, nb_pts = e.nb_pts(), "ql reduce");
    let m = match e.nb_pts() {
        0 => {
            return Ok(QlReduced {
                s: None,
                new_z: Vec::new(),
                c: factor,
                u,
                a1: 0,
            })
        }
        1 => e.points().next().ok_or(ThetaError::SeveralPoints { count: 0 })?,
        count => return Err(ThetaError::SeveralPoints { count }),
    };

    let a1 = get_a(&m);
    let t: Vec<Acb> = m
        .iter()
        .map(|&x| Acb::from_real(Ball::from_dyadic(Dyadic::new(x.into(), -1))))
        .collect();
    let x = tau.view(0, s, s, d).to_matrix();
    let xt = x.mul_vec(&t, prec);
    for (zj, w) in new_z.iter_mut().zip(&xt) {
        *zj = zj.add(w, prec);
    }
    let tau1 = tau.view(s, s, d, d).to_matrix();
    let w: Vec<Acb> = tau1
        .mul_vec(&t, prec)
        .iter()
        .zip(&new_z[s..])
        .map(|(y, zj)| y.add(&zj.mul_2exp(1), prec))
        .collect();
    let f = t
        .iter()
        .zip(&w)
        .fold(Acb::zero(), |acc, (ti, wi)| acc.add(&ti.mul(wi, prec), prec));
    factor = factor.mul(&exp_pi_i(&f, prec), prec);
    new_z.truncate(s);

    Ok(QlReduced {
        s: Some(s),
        new_z,
        c: factor,
        u,
        a1,
    })
}
