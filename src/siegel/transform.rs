use crate::ball::{exp_pi_i, Acb};
use crate::error::{Result, ThetaError};
use crate::matrix::{AcbMat, IntMat};

use super::sp2gz::{Generator, Transform};

fn not_invertible(prec: u64) -> ThetaError {
    ThetaError::InsufficientPrecision {
        stage: "symplectic transformation",
        prec,
    }
}

/// `Cτ + D`.
pub fn cocycle(m: &IntMat, tau: &AcbMat, prec: u64) -> Result<AcbMat> {
    let (_, _, c, d) = m.blocks()?;
    c.to_acb_mat().mul(tau, prec)?.add(&d.to_acb_mat(), prec)
}

/// `M·τ = (Aτ + B)(Cτ + D)⁻¹`.
pub fn siegel_transform(m: &IntMat, tau: &AcbMat, prec: u64) -> Result<AcbMat> {
    let (a, b, _, _) = m.blocks()?;
    let num = a.to_acb_mat().mul(tau, prec)?.add(&b.to_acb_mat(), prec)?;
    let den = cocycle(m, tau, prec)?
        .inv(prec)
        .ok_or_else(|| not_invertible(prec))?;
    num.mul(&den, prec)
}

/// `(M·z, M·τ)` with `M·z = (Cτ + D)^{-t} z`.
pub fn siegel_transform_z(
    m: &IntMat,
    z: &[Acb],
    tau: &AcbMat,
    prec: u64,
) -> Result<(Vec<Acb>, AcbMat)> {
    let inv = cocycle(m, tau, prec)?
        .inv(prec)
        .ok_or_else(|| not_invertible(prec))?;
    if z.len() != inv.rows() {
        return Err(ThetaError::InvalidDimension {
            expected: inv.rows(),
            got: z.len(),
        });
    }
    let new_z = inv.transpose().mul_vec(z, prec);
    Ok((new_z, siegel_transform(m, tau, prec)?))
}

/// `zᵗ(Cτ + D)⁻¹Cz`, or `None` when `C = 0`.
fn quadratic_term(m: &IntMat, q: &AcbMat, z: &[Acb], prec: u64) -> Result<Option<Acb>> {
    let (_, _, c, _) = m.blocks()?;
    if c.is_zero() {
        return Ok(None);
    }
    let qinv = q.inv(prec).ok_or_else(|| not_invertible(prec))?;
    let cz = c.to_acb_mat().mul_vec(z, prec);
    let w = qinv.mul_vec(&cz, prec);
    Ok(Some(z.iter().zip(&w).fold(Acb::zero(), |acc, (x, y)| {
        acc.add(&x.mul(y, prec), prec)
    })))
}

/// `det(Cτ + D)·exp(2πi zᵗ(Cτ + D)⁻¹Cz)`, the automorphy factor of squared
/// theta values up to a fourth root of unity.
pub fn automorphy_sqr(m: &IntMat, z: &[Acb], tau: &AcbMat, prec: u64) -> Result<Acb> {
    let q = cocycle(m, tau, prec)?;
    let det = q.det(prec)?;
    Ok(match quadratic_term(m, &q, z, prec)? {
        Some(e) => det.mul(&exp_pi_i(&e.mul_2exp(1), prec), prec),
        None => det,
    })
}

/// A square root of `det(Cτ + D)` that depends continuously on `τ`: the
/// product over the word of the principal roots of each generator's own
/// determinant, taken at the intermediate matrices.
pub fn sqrt_cocycle(t: &Transform, tau: &AcbMat, prec: u64) -> Result<Acb> {
    let g = t.dim();
    let mut x = tau.clone();
    let mut s = Acb::one();
    for gen in t.word().iter().rev() {
        match gen {
            Generator::BlockDiag { det, .. } if *det == -1 => s = s.mul_onei(),
            Generator::BlockDiag { .. } | Generator::Trig(_) => {}
            Generator::EmbedJ => s = s.mul(&x[(0, 0)].neg().sqrt(prec), prec),
            Generator::EmbedJInv => s = s.mul(&x[(0, 0)].sqrt(prec), prec),
        }
        x = siegel_transform(&gen.matrix(g)?, &x, prec)?;
    }
    Ok(s)
}

/// `sqrt(det(Cτ + D))·exp(πi zᵗ(Cτ + D)⁻¹Cz)` with the root of
/// [`sqrt_cocycle`], the automorphy factor of theta values up to an eighth
/// root of unity.
pub fn automorphy(t: &Transform, z: &[Acb], tau: &AcbMat, prec: u64) -> Result<Acb> {
    let s = sqrt_cocycle(t, tau, prec)?;
    let q = cocycle(t.mat(), tau, prec)?;
    Ok(match quadratic_term(t.mat(), &q, z, prec)? {
        Some(e) => s.mul(&exp_pi_i(&e, prec), prec),
        None => s,
    })
}
