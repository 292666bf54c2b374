//! Theta values by direct summation over the lattice points of an ellipsoid.
//!
//! Every routine follows the same plan: move each `z` close to the real
//! subspace with [`naive_reduce`], pick the radius whose tail bound meets the
//! requested precision, enumerate one ellipsoid shared by all points, then
//! sum with per-point factors from [`precomp::Precomp`]. Results carry the
//! tail bound in their radius.

pub mod precomp;
pub mod radius;
pub mod reduce;
pub mod worker;

use rayon::prelude::*;
use tracing::debug;

use crate::ball::{exp_pi_i, pi, Acb, Ball, Dyadic, Mag};
use crate::characteristic::{dot, dot_acb, get_acb, Char};
use crate::cholesky::eld_cho;
use crate::ellipsoid::Ellipsoid;
use crate::error::{Result, ThetaError};
use crate::matrix::AcbMat;
use crate::params::ThetaParams;

pub use radius::{naive_radius, tail_bound};
pub use reduce::{naive_reduce, ReducedZ};
pub use worker::jet_orders;

use precomp::{PhaseTable, Precomp};

/// Checks that `tau` is a symmetric square matrix and that every `z` has
/// its dimension.
pub(crate) fn check_input(zs: &[Vec<Acb>], tau: &AcbMat) -> Result<usize> {
    let g = tau.ensure_square()?;
    tau.check_symmetric()?;
    for z in zs {
        if z.len() != g {
            return Err(ThetaError::InvalidDimension {
                expected: g,
                got: z.len(),
            });
        }
    }
    Ok(g)
}

/// The ellipsoid and reduced points of one summation.
#[derive(Clone, Debug)]
pub struct NaiveSetup {
    pub ellipsoid: Ellipsoid,
    pub reduced: Vec<ReducedZ>,
    /// Absolute error of each sum at its reduced point.
    pub errors: Vec<Mag>,
    pub r2: Dyadic,
}

/// Builds the summation domain for `zs`.
///
/// With `ord > 0` the points are not moved, and the errors bound every
/// Taylor coefficient of order at most `ord`.
pub fn naive_ellipsoid(zs: &[Vec<Acb>], tau: &AcbMat, ord: u32, prec: u64) -> Result<NaiveSetup> {
    let g = check_input(zs, tau)?;
    let c = eld_cho(tau, prec)?;
    let yinv = tau
        .imag_part()
        .inv(prec)
        .ok_or(ThetaError::InsufficientPrecision {
            stage: "imaginary part inverse",
            prec,
        })?;

    let reduced = zs
        .iter()
        .map(|z| {
            if ord == 0 {
                naive_reduce(z, tau, &c, &yinv, prec)
            } else {
                Ok(ReducedZ::unshifted(z, &c, &yinv, prec))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    // |n|_inf <= |C^-1|_inf (|C n - v| + |v|) turns the tail of the jet into
    // the tail of the plain sum times a per-point scale.
    let scales: Vec<Mag> = if ord == 0 {
        vec![Mag::one(); reduced.len()]
    } else {
        let cinv = c.inv(prec).ok_or(ThetaError::InsufficientPrecision {
            stage: "cholesky inverse",
            prec,
        })?;
        let four_pi = pi(prec).mul_2exp(2).mag_upper();
        let base = four_pi.mul(&cinv.norm_inf_upper());
        reduced
            .iter()
            .map(|r| {
                let v = Ord::max(r.offset_norm(prec), Mag::one());
                Ord::max(base.mul(&v), Mag::one()).pow_ui(u64::from(ord))
            })
            .collect()
    };
    let extra = scales
        .iter()
        .map(|s| s.log2_ceil().max(0) as u64)
        .max()
        .unwrap_or(0);
    let (r2, eps) = naive_radius(&c, ord, prec + extra)?;

    let ellipsoid = match reduced.as_slice() {
        [single] => Ellipsoid::fill(&c, &r2, &single.offset, prec)?,
        _ => {
            // one ellipsoid centred at zero containing every per-point one
            let vmax = reduced
                .iter()
                .map(|r| r.offset_norm(prec))
                .max()
                .unwrap_or_else(Mag::zero);
            let r = Ball::from_dyadic(r2.clone())
                .sqrt(prec)
                .add(&Ball::from_dyadic(Dyadic::from_mag(&vmax)), prec);
            let big = r.sqr(prec).upper().ok_or(ThetaError::InsufficientPrecision {
                stage: "naive ellipsoid",
                prec,
            })?;
            Ellipsoid::fill(&c, &big, &vec![Ball::zero(); g], prec)?
        }
    };
    debug!(
        g,
        nb_z = zs.len(),
        nb_pts = ellipsoid.nb_pts(),
        prec,
        "naive ellipsoid"
    );

    let errors = reduced
        .iter()
        .zip(&scales)
        .map(|(r, s)| r.u.mul(s).mul(&eps))
        .collect();
    Ok(NaiveSetup {
        ellipsoid,
        reduced,
        errors,
        r2,
    })
}

/// Working precision for a sum over `nb_pts` terms.
fn working_prec(prec: u64, nb_pts: usize, params: &ThetaParams) -> u64 {
    prec + params.guard_bits + (usize::BITS - nb_pts.leading_zeros()) as u64
}

fn map_points<T: Send>(
    n: usize,
    params: &ThetaParams,
    f: impl Fn(usize) -> T + Sync + Send,
) -> Vec<T> {
    if n >= params.par_threshold {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

/// `θ_{0,b}(z, τ)` for every `z` and, when `all_b`, every `b`.
fn sum_0b_all(
    zs: &[Vec<Acb>],
    tau: &AcbMat,
    all_b: bool,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    let g = check_input(zs, tau)?;
    let setup = naive_ellipsoid(zs, tau, 0, prec)?;
    let wp = working_prec(prec, setup.ellipsoid.nb_pts(), params);
    let pre = Precomp::new(&setup.ellipsoid, tau, wp, params.par_threshold);
    let per_z = map_points(zs.len(), params, |k| {
        let r = &setup.reduced[k];
        let phases = PhaseTable::new(&r.z, pre.bounds(), wp);
        worker::sum_0b(&pre, &phases, g, all_b, wp)
            .into_iter()
            .enumerate()
            .map(|(b, mut s)| {
                s.add_error(&setup.errors[k]);
                s.mul(&r.c, wp).mul_si(r.sign(b as u64), wp).round(prec)
            })
            .collect::<Vec<_>>()
    });
    Ok(per_z.into_iter().flatten().collect())
}

pub fn naive_00(zs: &[Vec<Acb>], tau: &AcbMat, prec: u64) -> Result<Vec<Acb>> {
    naive_00_with_params(zs, tau, prec, &ThetaParams::default())
}

pub fn naive_00_with_params(
    zs: &[Vec<Acb>],
    tau: &AcbMat,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    sum_0b_all(zs, tau, false, prec, params)
}

/// All `θ_{0,b}(z, τ)`, `2^g` values per point.
pub fn naive_0b(zs: &[Vec<Acb>], tau: &AcbMat, prec: u64) -> Result<Vec<Acb>> {
    naive_0b_with_params(zs, tau, prec, &ThetaParams::default())
}

pub fn naive_0b_with_params(
    zs: &[Vec<Acb>],
    tau: &AcbMat,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    sum_0b_all(zs, tau, true, prec, params)
}

/// Shifted point `z + τ·a/2` and the factor
/// `exp(πi ((a/2)ᵗτ(a/2) + 2 (a/2)ᵗz))` relating `θ_{a,0}(z)` to
/// `θ_{0,0}` at that point.
fn shift_by_a(z: &[Acb], tau: &AcbMat, a: u64, prec: u64) -> (Vec<Acb>, Acb) {
    let g = z.len();
    let half = get_acb(a, g);
    let v = tau.mul_vec(&half, prec);
    let shifted: Vec<Acb> = z.iter().zip(&v).map(|(x, y)| x.add(y, prec)).collect();
    let arg = dot_acb(a, &v, g, prec).add(&dot_acb(a, z, g, prec).mul_2exp(1), prec);
    (shifted, exp_pi_i(&arg, prec))
}

/// `θ_{a,b}(z, τ)` for one characteristic, through
/// `θ_{a,b}(z) = exp(πi ((a/2)ᵗτ(a/2) + 2 (a/2)ᵗ(z + b/2)))·θ_{0,0}(z + τa/2 + b/2)`.
pub fn naive_ind(ab: Char, zs: &[Vec<Acb>], tau: &AcbMat, prec: u64) -> Result<Vec<Acb>> {
    let g = check_input(zs, tau)?;
    let (a, b) = (ab.a(g), ab.b(g));
    let wp = prec + 10;
    let half_b = get_acb(b, g);
    let mut shifted = Vec::with_capacity(zs.len());
    let mut factors = Vec::with_capacity(zs.len());
    for z in zs {
        let zb: Vec<Acb> = z.iter().zip(&half_b).map(|(x, y)| x.add(y, wp)).collect();
        let (s, f) = shift_by_a(&zb, tau, a, wp);
        shifted.push(s);
        factors.push(f);
    }
    let th = naive_00(&shifted, tau, wp)?;
    Ok(th
        .iter()
        .zip(&factors)
        .map(|(t, f)| t.mul(f, wp).round(prec))
        .collect())
}

/// All `4^g` values `θ_{a,b}(z, τ)` per point, indexed by `(a << g) | b`.
pub fn naive_all(zs: &[Vec<Acb>], tau: &AcbMat, prec: u64) -> Result<Vec<Acb>> {
    naive_all_with_params(zs, tau, prec, &ThetaParams::default())
}

pub fn naive_all_with_params(
    zs: &[Vec<Acb>],
    tau: &AcbMat,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    let g = check_input(zs, tau)?;
    let n = 1u64 << g;
    let wp = prec + 10;
    let mut shifted = Vec::with_capacity(zs.len() * n as usize);
    let mut factors = Vec::with_capacity(zs.len() * n as usize);
    for z in zs {
        for a in 0..n {
            let (s, f) = shift_by_a(z, tau, a, wp);
            shifted.push(s);
            factors.push(f);
        }
    }
    let th = naive_0b_with_params(&shifted, tau, wp, params)?;
    let mut out = Vec::with_capacity(zs.len() * (n * n) as usize);
    for (k, f) in factors.iter().enumerate() {
        let a = k as u64 % n;
        for b in 0..n {
            let x = th[k * n as usize + b as usize].mul(f, wp).mul_i_pow(dot(a, b, g));
            out.push(x.round(prec));
        }
    }
    Ok(out)
}

/// All `θ_{a,0}(z, τ)`, `2^g` values per point indexed by `a`.
pub fn naive_a0(zs: &[Vec<Acb>], tau: &AcbMat, prec: u64) -> Result<Vec<Acb>> {
    naive_a0_with_params(zs, tau, prec, &ThetaParams::default())
}

pub fn naive_a0_with_params(
    zs: &[Vec<Acb>],
    tau: &AcbMat,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    let g = check_input(zs, tau)?;
    let n = 1u64 << g;
    let wp = prec + 10;
    let (shifted, factors): (Vec<_>, Vec<_>) = zs
        .iter()
        .flat_map(|z| (0..n).map(move |a| shift_by_a(z, tau, a, wp)))
        .unzip();
    let th = naive_00_with_params(&shifted, tau, wp, params)?;
    Ok(th
        .iter()
        .zip(&factors)
        .map(|(t, f)| t.mul(f, wp).round(prec))
        .collect())
}

/// Taylor coefficients in `z` of every `θ_{0,b}` up to total order `ord`.
///
/// Per point, the output holds `2^g` blocks (one per `b`), each listing the
/// coefficients in the order of [`jet_orders`].
pub fn naive_0b_jet(zs: &[Vec<Acb>], tau: &AcbMat, ord: u32, prec: u64) -> Result<Vec<Acb>> {
    naive_0b_jet_with_params(zs, tau, ord, prec, &ThetaParams::default())
}

pub fn naive_0b_jet_with_params(
    zs: &[Vec<Acb>],
    tau: &AcbMat,
    ord: u32,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    let g = check_input(zs, tau)?;
    let setup = naive_ellipsoid(zs, tau, ord, prec)?;
    let wp = working_prec(prec, setup.ellipsoid.nb_pts(), params) + 2 * u64::from(ord);
    let pre = Precomp::new(&setup.ellipsoid, tau, wp, params.par_threshold);
    let per_z = map_points(zs.len(), params, |k| {
        let phases = PhaseTable::new(&setup.reduced[k].z, pre.bounds(), wp);
        worker::sum_0b_jet(&pre, &phases, g, ord, wp)
            .into_iter()
            .map(|mut s| {
                s.add_error(&setup.errors[k]);
                s.round(prec)
            })
            .collect::<Vec<_>>()
    });
    Ok(per_z.into_iter().flatten().collect())
}

/// One term `exp(πi nᵗτn + 2πi nᵗz)`.
pub fn naive_term(z: &[Acb], tau: &AcbMat, n: &[i64], prec: u64) -> Acb {
    let g = n.len();
    let nb: Vec<Acb> = n.iter().map(|&x| Acb::from_int(x)).collect();
    let tn = tau.mul_vec(&nb, prec);
    let arg = (0..g).fold(Acb::zero(), |acc, j| {
        let t = tn[j].add(&z[j].mul_2exp(1), prec);
        acc.add(&t.mul_si(n[j], prec), prec)
    });
    exp_pi_i(&arg, prec)
}
