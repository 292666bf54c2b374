//! Public entry points.
//!
//! The period matrix is reduced once, values are computed at the reduced
//! matrix by the quasi-linear evaluator and carried back. Precision
//! shortfalls are retried with more guard bits; when every attempt falls
//! short the values come back as indeterminate balls.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::ball::Acb;
use crate::error::Result;
use crate::matrix::AcbMat;
use crate::naive::{check_input, naive_0b_jet_with_params};
use crate::params::ThetaParams;
use crate::ql::newton_sqrt;
use crate::siegel::ReducedTau;

/// Attempts at increasing guard bits before giving up on a request.
const MAX_ATTEMPTS: u32 = 4;

/// Runs `f` at `prec` plus a growing number of guard bits. `None` means
/// every attempt ran short of precision.
fn with_retries<T>(
    prec: u64,
    params: &ThetaParams,
    mut f: impl FnMut(u64) -> Result<T>,
) -> Result<Option<T>> {
    let mut extra = params.guard_bits;
    for attempt in 0..MAX_ATTEMPTS {
        match f(prec + extra) {
            Ok(x) => return Ok(Some(x)),
            Err(err) if !err.is_fatal() => {
                debug!(%err, attempt, extra, "retrying with more precision");
                extra = 2 * extra + 32;
            }
            Err(err) => return Err(err),
        }
    }
    warn!(prec, "precision retries exhausted");
    Ok(None)
}

fn indeterminate(n: usize) -> Vec<Acb> {
    vec![Acb::indeterminate(); n]
}

/// All `θ²_{a,b}(z, τ)`, indexed by `(a << g) | b`.
pub fn theta_all_sqr(z: &[Acb], tau: &AcbMat, prec: u64) -> Result<Vec<Acb>> {
    theta_all_sqr_with_params(z, tau, prec, &ThetaParams::default())
}

pub fn theta_all_sqr_with_params(
    z: &[Acb],
    tau: &AcbMat,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    let g = check_input(&[z.to_vec()], tau)?;
    params.validate()?;
    let out = with_retries(prec, params, |wp| {
        let red = ReducedTau::new(tau, wp, params)?;
        let sq = red.all_sqr(z, wp, params)?;
        Ok(sq.iter().map(|x| x.round(prec)).collect())
    })?;
    Ok(out.unwrap_or_else(|| indeterminate(1 << (2 * g))))
}

/// All `θ_{a,b}(z, τ)`, indexed by `(a << g) | b`.
pub fn theta_all(z: &[Acb], tau: &AcbMat, prec: u64) -> Result<Vec<Acb>> {
    theta_all_with_params(z, tau, prec, &ThetaParams::default())
}

pub fn theta_all_with_params(
    z: &[Acb],
    tau: &AcbMat,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    let g = check_input(&[z.to_vec()], tau)?;
    params.validate()?;
    let out = with_retries(prec, params, |wp| {
        let red = ReducedTau::new(tau, wp, params)?;
        signed_values(z, &red, wp, params)
    })?;
    Ok(match out {
        Some(values) => values.iter().map(|x| x.round(prec)).collect(),
        None => indeterminate(1 << (2 * g)),
    })
}

/// `θ_{a,b}(z, τ)` for every point of `zs`, one block of `4^g` values per
/// point. The reduction of `τ` is shared across points.
pub fn theta_all_many(zs: &[Vec<Acb>], tau: &AcbMat, prec: u64) -> Result<Vec<Vec<Acb>>> {
    theta_all_many_with_params(zs, tau, prec, &ThetaParams::default())
}

pub fn theta_all_many_with_params(
    zs: &[Vec<Acb>],
    tau: &AcbMat,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Vec<Acb>>> {
    let g = check_input(zs, tau)?;
    params.validate()?;
    let out = with_retries(prec, params, |wp| {
        let red = ReducedTau::new(tau, wp, params)?;
        let run = |z: &Vec<Acb>| signed_values(z, &red, wp, params);
        if zs.len() >= params.par_threshold {
            zs.par_iter().map(run).collect::<Result<Vec<_>>>()
        } else {
            zs.iter().map(run).collect::<Result<Vec<_>>>()
        }
    })?;
    Ok(match out {
        Some(values) => values
            .into_iter()
            .map(|v| v.iter().map(|x| x.round(prec)).collect())
            .collect(),
        None => vec![indeterminate(1 << (2 * g)); zs.len()],
    })
}

/// Derivatives in `z` of every `θ_{0,b}` up to total order `ord`, as Taylor
/// coefficients; see [`crate::naive::naive_0b_jet`] for the layout.
pub fn theta_jets(zs: &[Vec<Acb>], tau: &AcbMat, ord: u32, prec: u64) -> Result<Vec<Acb>> {
    theta_jets_with_params(zs, tau, ord, prec, &ThetaParams::default())
}

pub fn theta_jets_with_params(
    zs: &[Vec<Acb>],
    tau: &AcbMat,
    ord: u32,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    let g = check_input(zs, tau)?;
    params.validate()?;
    let per_point = (1usize << g) * crate::naive::jet_orders(g, ord).len();
    let out = with_retries(prec, params, |wp| {
        let jets = naive_0b_jet_with_params(zs, tau, ord, wp, params)?;
        Ok(jets.iter().map(|x| x.round(prec)).collect::<Vec<_>>())
    })?;
    Ok(out.unwrap_or_else(|| indeterminate(zs.len() * per_point)))
}

/// Signed values from squares: each root is chosen against direct sums at
/// the reduced matrix carried back to `τ`, computed at `params.low_prec`
/// and doubled until every sign is settled. Values whose reference and
/// square both contain zero are returned as `0 ± sqrt(|θ²|)`.
fn signed_values(z: &[Acb], red: &ReducedTau, prec: u64, params: &ThetaParams) -> Result<Vec<Acb>> {
    let sq = red.all_sqr(z, prec, params)?;
    let mut lp = params.low_prec;
    while lp <= prec {
        let reference = red.naive_all(z, lp, params)?;
        match match_roots(&sq, &reference, prec) {
            Some(values) => return Ok(values),
            None => {
                debug!(lp, "sign references too coarse");
                lp *= 2;
            }
        }
    }
    warn!(prec, "sign selection failed, summing at the reduced matrix");
    red.naive_all(z, prec, params)
}

fn match_roots(sq: &[Acb], reference: &[Acb], prec: u64) -> Option<Vec<Acb>> {
    sq.iter()
        .zip(reference)
        .map(|(w, r)| {
            if r.contains_zero() {
                if !w.contains_zero() {
                    return None;
                }
                let mut x = Acb::zero();
                x.add_error(&w.mag_upper().sqrt());
                return Some(x);
            }
            newton_sqrt(w, r, prec).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ball::Ball;
    use crate::error::ThetaError;
    use crate::naive::{naive_0b_jet, naive_all};

    #[test]
    fn test_theta_all_at_reduced_point() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.2, 1.1), (0.1, 0.2)], vec![(0.1, 0.2), (-0.3, 0.9)]]).unwrap();
        let z = vec![Acb::from_f64(0.1, 0.2), Acb::from_f64(-0.2, 0.1)];
        let prec = 128;
        let th = theta_all(&z, &tau, prec).unwrap();
        let reference = naive_all(&[z], &tau, prec).unwrap();
        assert_eq!(th.len(), 16);
        for (x, y) in th.iter().zip(&reference) {
            assert!(x.overlaps(y));
        }
    }

    #[test]
    fn test_theta_all_through_reduction() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.45, 0.35)]]).unwrap();
        let z = vec![Acb::from_f64(0.15, -0.05)];
        let prec = 96;
        let th = theta_all(&z, &tau, prec).unwrap();
        let reference = naive_all(&[z], &tau, prec).unwrap();
        for (x, y) in th.iter().zip(&reference) {
            assert!(x.overlaps(y));
            assert!(x.is_finite());
        }
    }

    #[test]
    fn test_signs_near_the_real_axis() {
        let tau = AcbMat::from_c64_rows(&[
            vec![(0.3, 0.05), (0.1, 0.01)],
            vec![(0.1, 0.01), (-0.2, 0.06)],
        ])
        .unwrap();
        let z = vec![Acb::from_f64(0.05, 0.01), Acb::from_f64(-0.1, 0.02)];
        let prec = 96;
        let red = ReducedTau::new(&tau, prec, &ThetaParams::default()).unwrap();
        assert!(!red.is_trivial());
        let th = theta_all(&z, &tau, prec).unwrap();
        let reference = naive_all(&[z], &tau, 64).unwrap();
        for (ab, (x, y)) in th.iter().zip(&reference).enumerate() {
            assert!(x.overlaps(y), "characteristic {}", ab);
            assert!(x.rel_accuracy_bits() > 60 || y.contains_zero());
        }
    }

    #[test]
    fn test_nearly_singular_imaginary_part() {
        let prec = 200;
        let c = Ball::one().sub(&Ball::one().mul_2exp(-60), prec);
        let tau = AcbMat::from_fn(2, 2, |i, j| {
            let y = if i == j { Ball::one() } else { c.clone() };
            Acb::new(Ball::zero(), y)
        });
        let z = vec![Acb::zero(), Acb::zero()];
        let sq = theta_all_sqr(&z, &tau, prec).unwrap();
        let th = theta_all(&z, &tau, prec).unwrap();
        assert!(sq[0].is_finite() && !sq[0].contains_zero());
        for (x, y) in th.iter().zip(&sq) {
            assert!(x.sqr(prec).overlaps(y));
        }
    }

    #[test]
    fn test_odd_constant_vanishes() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.0, 1.0)]]).unwrap();
        let th = theta_all(&[Acb::zero()], &tau, 64).unwrap();
        // θ_{1,1}(0, τ) = 0
        assert!(th[3].contains_zero());
        assert!(!th[0].contains_zero());
    }

    #[test]
    fn test_many_points_share_reduction() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.1, 0.8)]]).unwrap();
        let zs: Vec<Vec<Acb>> = (0..5).map(|k| vec![Acb::from_f64(0.1 * k as f64, 0.05)]).collect();
        let many = theta_all_many(&zs, &tau, 80).unwrap();
        assert_eq!(many.len(), 5);
        for (z, values) in zs.iter().zip(&many) {
            let single = theta_all(z, &tau, 80).unwrap();
            for (x, y) in values.iter().zip(&single) {
                assert!(x.overlaps(y));
            }
        }
    }

    #[test]
    fn test_jets_agree_with_naive() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.0, 1.0)]]).unwrap();
        let zs = vec![vec![Acb::from_f64(0.1, 0.0)]];
        let jets = theta_jets(&zs, &tau, 2, 64).unwrap();
        let reference = naive_0b_jet(&zs, &tau, 2, 64).unwrap();
        assert_eq!(jets.len(), reference.len());
        for (x, y) in jets.iter().zip(&reference) {
            assert!(x.overlaps(y));
        }
    }

    #[test]
    fn test_bad_input() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.0, 1.0), (0.0, 0.0)]]).unwrap();
        assert!(matches!(
            theta_all(&[Acb::zero()], &tau, 64),
            Err(ThetaError::NotSquare { .. })
        ));
        let tau = AcbMat::from_c64_rows(&[vec![(0.0, 1.0)]]).unwrap();
        assert!(matches!(
            theta_all(&[Acb::zero(), Acb::zero()], &tau, 64),
            Err(ThetaError::InvalidDimension { .. })
        ));
        let params = ThetaParams {
            lll_delta: 0.1,
            ..ThetaParams::default()
        };
        assert!(matches!(
            theta_all_sqr_with_params(&[Acb::zero()], &tau, 64, &params),
            Err(ThetaError::InvalidParameters(_))
        ));
    }
}
