use num_bigint::BigInt;
use tracing::{debug, warn};

use crate::error::{Result, ThetaError};
use crate::matrix::{AcbMat, IntMat};
use crate::params::ThetaParams;

use super::lll::lll_reduce;
use super::sp2gz::{Generator, Transform};
use super::transform::siegel_transform;

/// `|τ_00|` below this triggers an inversion of the first coordinate.
const INVERT_BELOW: f64 = 0.99;

fn current(t: &Transform, tau: &AcbMat, prec: u64) -> Result<AcbMat> {
    let x = siegel_transform(t.mat(), tau, prec)?;
    if x.is_finite() {
        Ok(x)
    } else {
        Err(ThetaError::InsufficientPrecision {
            stage: "siegel reduction",
            prec,
        })
    }
}

/// Moves `τ` towards the Siegel fundamental domain.
///
/// Each round LLL-reduces `Im τ`, rounds `Re τ` to integers and, when
/// `|τ_00| < 1`, applies the inversion on the first coordinate. Decisions
/// are taken at `params.low_prec`, doubled up to `prec` while the current
/// matrix is too coarse to decide. Returns the transformation `M` and `M·τ`
/// at `prec`.
pub fn siegel_reduce(tau: &AcbMat, prec: u64, params: &ThetaParams) -> Result<(Transform, AcbMat)> {
    let g = tau.ensure_square()?;
    if g == 0 {
        return Ok((Transform::identity(g), tau.clone()));
    }
    let mut lp = params.low_prec.min(prec);
    let t = loop {
        match reduction_word(tau, lp, params) {
            Ok(t) => break t,
            Err(ThetaError::InsufficientPrecision { stage, .. }) if lp < prec => {
                debug!(stage, lp, "raising reduction precision");
                lp = (2 * lp).min(prec);
            }
            Err(err) => return Err(err),
        }
    };
    let reduced = if t.word().is_empty() {
        tau.clone()
    } else {
        siegel_transform(t.mat(), tau, prec)?
    };
    Ok((t, reduced))
}

fn reduction_word(tau: &AcbMat, lp: u64, params: &ThetaParams) -> Result<Transform> {
    let g = tau.rows();
    let mut t = Transform::identity(g);
    let mut x = tau.clone();
    let mut steps = 0;
    loop {
        if steps == params.max_reduce_steps {
            warn!(steps, "siegel reduction did not settle");
            break;
        }
        steps += 1;

        let u = lll_reduce(&x.imag_part(), params.lll_delta, lp)?;
        if !u.is_identity() {
            t.push_left(Generator::block_diag(u)?)?;
            x = current(&t, tau, lp)?;
        }

        let re = x.real_part().to_f64();
        let s = IntMat::from_fn(g, g, |i, j| {
            let (i, j) = if i <= j { (i, j) } else { (j, i) };
            BigInt::from(-(re[i][j].round() as i64))
        });
        if !s.is_zero() {
            t.push_left(Generator::Trig(s))?;
            x = current(&t, tau, lp)?;
        }

        let (re00, im00) = x[(0, 0)].to_c64();
        if re00.hypot(im00) < INVERT_BELOW {
            t.push_left(Generator::EmbedJ)?;
            x = current(&t, tau, lp)?;
        } else {
            break;
        }
    }
    debug!(g, steps, lp, generators = t.word().len(), "siegel reduction");
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ball::{Acb, Ball};
    use crate::siegel::sp2gz::is_symplectic;

    #[test]
    fn test_reduced_matrix_is_untouched() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.1, 1.0), (0.2, 0.3)], vec![(0.2, 0.3), (0.0, 1.5)]]).unwrap();
        let (t, reduced) = siegel_reduce(&tau, 128, &ThetaParams::default()).unwrap();
        assert!(t.mat().is_identity());
        assert_eq!(reduced, tau);
    }

    #[test]
    fn test_small_imaginary_part_is_inverted() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.3, 0.01)]]).unwrap();
        let (t, reduced) = siegel_reduce(&tau, 128, &ThetaParams::default()).unwrap();
        assert!(is_symplectic(t.mat()));
        let (re, im) = reduced[(0, 0)].to_c64();
        assert!(re.abs() <= 0.5 + 1e-9);
        assert!(re.hypot(im) >= INVERT_BELOW);
        assert!(im > 0.5);
    }

    #[test]
    fn test_nearly_singular_imaginary_part() {
        let prec = 200;
        let c = Ball::one().sub(&Ball::one().mul_2exp(-60), prec);
        let tau = AcbMat::from_fn(2, 2, |i, j| {
            let y = if i == j { Ball::one() } else { c.clone() };
            Acb::new(Ball::zero(), y)
        });
        let params = ThetaParams {
            low_prec: 32,
            ..ThetaParams::default()
        };
        let (t, reduced) = siegel_reduce(&tau, prec, &params).unwrap();
        assert!(is_symplectic(t.mat()));
        let y = reduced.imag_part().to_f64();
        assert!(y[0][0] > 0.5 && y[1][1] > 0.5);
    }

    #[test]
    fn test_genus_two_reduction() {
        let tau = AcbMat::from_c64_rows(&[
            vec![(3.2, 0.05), (1.1, 0.04)],
            vec![(1.1, 0.04), (-2.7, 0.06)],
        ])
        .unwrap();
        let (t, reduced) = siegel_reduce(&tau, 128, &ThetaParams::default()).unwrap();
        assert!(is_symplectic(t.mat()));
        let y = reduced.imag_part().to_f64();
        assert!(y[0][0] > 0.5 && y[1][1] > 0.5);
        assert!(reduced.overlaps(&siegel_transform(t.mat(), &tau, 128).unwrap()));
    }
}
