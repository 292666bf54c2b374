use tracing::debug;

use crate::ball::{pi, Ball};
use crate::error::{Result, ThetaError};
use crate::matrix::{AcbMat, BallMat};

/// Cholesky factorization of a symmetric matrix.
///
/// Returns the lower triangular `L` with `L·Lᵗ ∋ A`, computed row by row
/// (Banachiewicz). Only the lower triangle of `a` is read and the strict
/// upper triangle of the result is zero.
///
/// Fails with `NotPositiveDefinite` when a pivot is certainly not positive,
/// and with `InsufficientPrecision` when a pivot ball straddles zero.
pub fn cho(a: &BallMat, prec: u64) -> Result<BallMat> {
    let n = a.ensure_square()?;
    let mut l = BallMat::zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let s = (0..j).fold(a[(i, j)].clone(), |acc, k| {
                acc.sub(&l[(i, k)].mul(&l[(j, k)], prec), prec)
            });
            if i == j {
                if s.is_nonpositive() {
                    return Err(ThetaError::NotPositiveDefinite { prec });
                }
                if !s.is_positive() {
                    debug!(row = i, prec, "cholesky pivot not certifiably positive");
                    return Err(ThetaError::InsufficientPrecision {
                        stage: "cholesky",
                        prec,
                    });
                }
                l[(i, i)] = s.sqrt(prec);
            } else {
                l[(i, j)] = s.div(&l[(j, j)], prec);
            }
        }
    }
    Ok(l)
}

/// Upper triangular `C` with `Cᵗ·C = π·Im(τ)`, the factor that turns theta
/// term magnitudes into Euclidean distances: `|exp(πi nᵗτn)| = exp(-‖Cn‖²)`.
pub fn eld_cho(tau: &AcbMat, prec: u64) -> Result<BallMat> {
    tau.ensure_square()?;
    let y = tau.imag_part().scale(&pi(prec), prec);
    Ok(cho(&y, prec)?.transpose())
}

/// Diagonal of a triangular factor.
pub fn diagonal(c: &BallMat) -> Vec<Ball> {
    (0..c.rows().min(c.cols())).map(|i| c[(i, i)].clone()).collect()
}
