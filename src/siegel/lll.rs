use crate::ball::Ball;
use crate::error::{Result, ThetaError};
use crate::matrix::{BallMat, IntMat};

const MAX_SWAPS: usize = 10_000;

/// LLL reduction of the quadratic form with Gram matrix `y`.
///
/// Returns a unimodular `U` such that the rows of `U` form an LLL-reduced
/// basis for `y`, i.e. `U y Uᵗ` is reduced. The Gram-Schmidt data is kept
/// in balls at `prec`; rounding and the Lovász test read midpoints.
pub fn lll_reduce(y: &BallMat, delta: f64, prec: u64) -> Result<IntMat> {
    if delta <= 0.25 || delta >= 1.0 {
        return Err(ThetaError::InvalidParameters(
            "Delta must be in (0.25, 1.0)".to_string(),
        ));
    }
    let n = y.ensure_square()?;
    let mut u: Vec<Vec<i64>> = (0..n)
        .map(|i| (0..n).map(|j| i64::from(i == j)).collect())
        .collect();

    let mut k = 1;
    let mut swaps = 0;
    while k < n {
        // Size reduction
        for j in (0..k).rev() {
            let (mu, _) = gram_schmidt(&gram(y, &u, prec), k + 1, prec)?;
            let m = mu[k][j].to_f64();
            if m.abs() > 0.5 {
                let r = m.round() as i64;
                for i in 0..n {
                    u[k][i] -= r * u[j][i];
                }
            }
        }

        // Lovász condition
        let (mu, b) = gram_schmidt(&gram(y, &u, prec), k + 1, prec)?;
        let m = mu[k][k - 1].to_f64();
        let bound = b[k - 1].mul(&Ball::from_f64(delta - m * m), prec);
        if b[k].sub(&bound, prec).to_f64() >= 0.0 {
            k += 1;
        } else {
            u.swap(k, k - 1);
            k = k.max(2) - 1;
            swaps += 1;
            if swaps > MAX_SWAPS {
                return Err(ThetaError::InvalidParameters(
                    "LLL reduction does not terminate".to_string(),
                ));
            }
        }
    }
    IntMat::from_i64_rows(&u)
}

/// `U y Uᵗ`.
fn gram(y: &BallMat, u: &[Vec<i64>], prec: u64) -> BallMat {
    let n = y.rows();
    let uy: Vec<Vec<Ball>> = u
        .iter()
        .map(|row| {
            (0..n)
                .map(|j| {
                    (0..n).fold(Ball::zero(), |acc, l| {
                        acc.add(&y[(l, j)].mul_si(row[l], prec), prec)
                    })
                })
                .collect()
        })
        .collect();
    BallMat::from_fn(n, n, |i, j| {
        (0..n).fold(Ball::zero(), |acc, l| acc.add(&uy[i][l].mul_si(u[j][l], prec), prec))
    })
}

/// Gram-Schmidt coefficients `mu` and squared norms `b` of the first `m`
/// basis vectors, read off the Gram matrix.
///
/// A norm that is certainly not positive means the form is not positive
/// definite; one that is merely not certified asks for more precision.
fn gram_schmidt(g: &BallMat, m: usize, prec: u64) -> Result<(Vec<Vec<Ball>>, Vec<Ball>)> {
    let mut mu = vec![vec![Ball::zero(); m]; m];
    let mut b = vec![Ball::zero(); m];
    for i in 0..m {
        for j in 0..i {
            let s = (0..j).fold(Ball::zero(), |acc, l| {
                acc.add(&mu[j][l].mul(&mu[i][l], prec).mul(&b[l], prec), prec)
            });
            mu[i][j] = g[(i, j)].sub(&s, prec).div(&b[j], prec);
        }
        let s = (0..i).fold(Ball::zero(), |acc, l| {
            acc.add(&mu[i][l].sqr(prec).mul(&b[l], prec), prec)
        });
        b[i] = g[(i, i)].sub(&s, prec);
        if !b[i].is_positive() {
            return Err(if b[i].is_nonpositive() {
                ThetaError::NotPositiveDefinite { prec }
            } else {
                ThetaError::InsufficientPrecision { stage: "lll", prec }
            });
        }
    }
    Ok((mu, b))
}
