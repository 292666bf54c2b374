//! Theta values through the duplication formula
//!
//! `θ_{a,0}(z, τ)·θ_{a,0}(0, τ) = Σ_b θ_{b,0}(z, 2τ)·θ_{a⊕b,0}(z, 2τ)`,
//!
//! started from naive sums at `2^k τ`, where few lattice points matter, and
//! walked down to `τ`. Theta constants are recovered from their squares by
//! [`newton::newton_sqrt`] against the references of an [`AgmContext`].

pub mod agm;
pub mod newton;
pub mod reduce;

use tracing::{debug, warn};

use crate::ball::Acb;
use crate::characteristic::dot;
use crate::distance::dist_a0;
use crate::error::{Result, ThetaError};
use crate::matrix::AcbMat;
use crate::naive::{check_input, naive_a0_with_params};
use crate::params::ThetaParams;

pub use agm::{AgmContext, ValidAgm};
pub use newton::newton_sqrt;
pub use reduce::{ql_reduce, QlReduced};

/// Deepest duplication level tried.
const MAX_DEPTH: usize = 16;

#[derive(Clone, Debug)]
pub enum Strategy {
    Naive,
    QuasiLinear(ValidAgm),
}

/// Largest squared distance of `dist_a0` at `z = 0` and the number of
/// duplication steps: the largest `k` with `2^k·d ≤ prec·ln(2)/4`, so that
/// the smallest constant at level `k` costs at most a quarter of `prec`.
pub fn ql_depth(tau: &AcbMat, prec: u64, params: &ThetaParams) -> Result<(f64, usize)> {
    let g = tau.ensure_square()?;
    if g == 0 {
        return Ok((0.0, 0));
    }
    let dist = dist_a0(&vec![Acb::zero(); g], tau, params.low_prec)?;
    let d = dist
        .iter()
        .filter_map(|x| x.upper())
        .map(|x| x.to_f64())
        .fold(0.0f64, f64::max);
    if d <= 0.0 {
        return Ok((0.0, 0));
    }
    let budget = prec as f64 * std::f64::consts::LN_2 / 4.0;
    let mut k = 0;
    while k < MAX_DEPTH && d * (1u64 << (k + 1)) as f64 <= budget {
        k += 1;
    }
    Ok((d, k))
}

pub fn select_strategy(tau: &AcbMat, prec: u64, params: &ThetaParams) -> Result<Strategy> {
    let (d, depth) = ql_depth(tau, prec, params)?;
    if depth == 0 {
        debug!(prec, "no duplication step pays off");
        return Ok(Strategy::Naive);
    }
    Ok(match AgmContext::establish(tau, depth, d, prec, params)? {
        Some(agm) => Strategy::QuasiLinear(agm),
        None => {
            debug!(prec, depth, "agm context not established, summing directly");
            Strategy::Naive
        }
    })
}

/// `Σ_b x_b·y_{a⊕b}` for every `a`.
fn convolve(x: &[Acb], y: &[Acb], prec: u64) -> Vec<Acb> {
    let n = x.len();
    (0..n)
        .map(|a| {
            (0..n).fold(Acb::zero(), |acc, b| acc.add(&x[b].mul(&y[a ^ b], prec), prec))
        })
        .collect()
}

/// Walks the duplication chain from level `agm.depth()` down to `τ`.
fn run_chain(
    z: &[Acb],
    tau: &AcbMat,
    agm: &ValidAgm,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    let g = tau.rows();
    let k = agm.depth();
    let wp = 2 * prec + params.guard_bits;
    let tau_k = tau.mul_2exp(k as i64);
    let start = wp + agm.extra_bits(k);
    let mut th0 = naive_a0_with_params(&[vec![Acb::zero(); g]], &tau_k, start, params)?;
    let mut thz = naive_a0_with_params(&[z.to_vec()], &tau_k, start, params)?;

    for j in (0..k).rev() {
        let lp = wp + agm.extra_bits(j);
        let sq = convolve(&th0, &th0, lp);
        let prod = convolve(&thz, &thz, lp);
        let roots = sq
            .iter()
            .zip(agm.refs(j))
            .map(|(w, r)| newton_sqrt(w, r, lp))
            .collect::<Result<Vec<_>>>()?;
        thz = prod
            .iter()
            .zip(&roots)
            .map(|(p, r)| {
                if r.contains_zero() {
                    Err(ThetaError::InsufficientPrecision {
                        stage: "duplication",
                        prec: lp,
                    })
                } else {
                    Ok(p.div(r, lp))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        th0 = roots;
    }
    Ok(thz.iter().map(|x| x.round(prec)).collect())
}

/// `θ_{a,0}(z, τ)` for every `a` on a matrix that needs no splitting.
fn ql_a0_core(z: &[Acb], tau: &AcbMat, prec: u64, params: &ThetaParams) -> Result<Vec<Acb>> {
    if tau.rows() == 0 {
        return Ok(vec![Acb::one()]);
    }
    match select_strategy(tau, prec, params)? {
        Strategy::Naive => naive_a0_with_params(&[z.to_vec()], tau, prec, params),
        Strategy::QuasiLinear(agm) => match run_chain(z, tau, &agm, prec, params) {
            Ok(th) => Ok(th),
            Err(err) if !err.is_fatal() => {
                warn!(%err, depth = agm.depth(), "duplication chain failed, summing directly");
                naive_a0_with_params(&[z.to_vec()], tau, prec, params)
            }
            Err(err) => Err(err),
        },
    }
}

/// `θ_{a,0}(z, τ)` for every `a ∈ {0,1}^g`, indexed by `a`.
pub fn uql_a0(z: &[Acb], tau: &AcbMat, prec: u64) -> Result<Vec<Acb>> {
    uql_a0_with_params(z, tau, prec, &ThetaParams::default())
}

pub fn uql_a0_with_params(
    z: &[Acb],
    tau: &AcbMat,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    let g = check_input(&[z.to_vec()], tau)?;
    params.validate()?;
    let n = 1usize << g;
    let red = ql_reduce(z, tau, prec)?;
    let err = red.c.mag_upper().mul(&red.u);
    let noise = || {
        let mut x = Acb::zero();
        x.add_error(&err);
        x
    };
    let s = match red.s {
        None => return Ok((0..n).map(|_| noise()).collect()),
        Some(s) => s,
    };
    let tau0 = tau.view(0, 0, s, s).to_matrix();
    let th0 = ql_a0_core(&red.new_z, &tau0, prec + 8, params)?;

    let d = g - s;
    let low = (1u64 << d) - 1;
    Ok((0..n as u64)
        .map(|a| {
            if a & low != red.a1 {
                return noise();
            }
            let mut x = th0[(a >> d) as usize].mul(&red.c, prec + 8);
            x.add_error(&err);
            x.round(prec)
        })
        .collect())
}

/// All `θ²_{a,b}(z, τ)`, indexed by `(a << g) | b`, from values at `2τ`:
///
/// `θ²_{a,b}(z, τ) = Σ_c (−1)^{c·b} θ_{c,0}(2z, 2τ)·θ_{c⊕a,0}(0, 2τ)`.
pub fn ql_all_sqr(z: &[Acb], tau: &AcbMat, prec: u64) -> Result<Vec<Acb>> {
    ql_all_sqr_with_params(z, tau, prec, &ThetaParams::default())
}

pub fn ql_all_sqr_with_params(
    z: &[Acb],
    tau: &AcbMat,
    prec: u64,
    params: &ThetaParams,
) -> Result<Vec<Acb>> {
    let g = check_input(&[z.to_vec()], tau)?;
    let n = 1u64 << g;
    let wp = prec + 8;
    let tau2 = tau.mul_2exp(1);
    let z2: Vec<Acb> = z.iter().map(|x| x.mul_2exp(1)).collect();
    let thz = uql_a0_with_params(&z2, &tau2, wp, params)?;
    let th0 = uql_a0_with_params(&vec![Acb::zero(); g], &tau2, wp, params)?;

    let mut out = Vec::with_capacity((n * n) as usize);
    for a in 0..n {
        for b in 0..n {
            let x = (0..n).fold(Acb::zero(), |acc, c| {
                let t = thz[c as usize].mul(&th0[(c ^ a) as usize], wp);
                if dot(c, b, g) % 2 == 1 {
                    acc.sub(&t, wp)
                } else {
                    acc.add(&t, wp)
                }
            });
            out.push(x.round(prec));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristic::Char;
    use crate::naive::{naive_all, naive_ind};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_depth_grows_with_precision() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.0, 1.0)]]).unwrap();
        let params = ThetaParams::default();
        let (d, k_low) = ql_depth(&tau, 64, &params).unwrap();
        let (_, k_high) = ql_depth(&tau, 1024, &params).unwrap();
        assert!(d > 0.7 && d < 0.8);
        assert!(k_high > k_low);
    }

    #[test]
    fn test_chain_matches_naive() {
        let tau = AcbMat::from_c64_rows(&[
            vec![(0.1, 0.9), (0.25, 0.2)],
            vec![(0.25, 0.2), (-0.15, 1.1)],
        ])
        .unwrap();
        let z = vec![Acb::from_f64(0.1, -0.05), Acb::from_f64(0.3, 0.1)];
        let prec = 300;
        let params = ThetaParams::default();
        let agm = match select_strategy(&tau, prec, &params).unwrap() {
            Strategy::QuasiLinear(agm) => agm,
            Strategy::Naive => panic!("expected a duplication strategy"),
        };
        let th = run_chain(&z, &tau, &agm, prec, &params).unwrap();
        let reference = naive_a0_with_params(&[z.clone()], &tau, prec, &params).unwrap();
        for (x, y) in th.iter().zip(&reference) {
            assert!(x.overlaps(y));
            assert!(x.rel_accuracy_bits() > 200);
        }
    }

    #[test]
    fn test_uql_a0_against_naive() {
        let mut rng = ChaCha20Rng::seed_from_u64(17);
        let g = 2;
        for iter in 0..4 {
            let prec = rng.gen_range(200..400);
            let mut tau = AcbMat::random_siegel(g, &mut rng);
            if iter % 2 == 0 {
                tau = tau.scale_last_imag_diag(10);
            }
            let z: Vec<Acb> = (0..g)
                .map(|_| Acb::from_f64(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5)))
                .collect();
            let th = uql_a0(&z, &tau, prec).unwrap();
            for a in 0..(1u64 << g) {
                let test = naive_ind(Char(a << g), &[z.clone()], &tau, prec).unwrap();
                assert!(th[a as usize].overlaps(&test[0]), "iter {}, a = {}", iter, a);
                assert!(th[a as usize].is_finite());
            }
        }
    }

    #[test]
    fn test_all_sqr_matches_naive() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.3, 1.1)]]).unwrap();
        let z = vec![Acb::from_f64(0.2, 0.1)];
        let prec = 128;
        let sqr = ql_all_sqr(&z, &tau, prec).unwrap();
        let all = naive_all(&[z], &tau, prec).unwrap();
        for (s, t) in sqr.iter().zip(&all) {
            assert!(s.overlaps(&t.sqr(prec)));
        }
    }
}
