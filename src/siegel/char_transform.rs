//! Action of `Sp_{2g}(ℤ)` on characteristics and the eighth roots of unity
//! in the transformation law
//!
//! `θ²[M∘m](M·z, M·τ) = i^{k(M, m)}·det(Cτ + D)·exp(2πi zᵗ(Cτ + D)⁻¹Cz)·θ²[m](z, τ)`.

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use tracing::debug;

use crate::ball::{Acb, Ball, Dyadic};
use crate::characteristic::{bit, Char};
use crate::error::{Result, ThetaError};
use crate::matrix::{AcbMat, IntMat};
use crate::naive::{naive_00, naive_ind};
use crate::params::ThetaParams;

use super::sp2gz::{Generator, Transform};
use super::transform::{cocycle, siegel_transform};

/// Doublings of the calibration precision before giving up.
const MAX_DOUBLINGS: usize = 8;

fn parity(x: &BigInt) -> u64 {
    u64::from(!(x % 2u32).is_zero())
}

fn row_dot(m: &IntMat, i: usize, v: u64, g: usize) -> u64 {
    (0..g).fold(0, |acc, j| acc ^ (parity(&m[(i, j)]) & bit(v, j, g)))
}

/// `M∘(a, b) = (Da − Cb + diag(CDᵗ), −Ba + Ab + diag(ABᵗ)) mod 2`.
pub fn char_transform(m: &IntMat, ab: Char) -> Result<Char> {
    let (a_blk, b_blk, c_blk, d_blk) = m.blocks()?;
    let g = a_blk.rows();
    let (a, b) = (ab.a(g), ab.b(g));
    let mut new_a = 0u64;
    let mut new_b = 0u64;
    for i in 0..g {
        let cd = (0..g).fold(BigInt::zero(), |acc, j| acc + &c_blk[(i, j)] * &d_blk[(i, j)]);
        let ab_diag = (0..g).fold(BigInt::zero(), |acc, j| acc + &a_blk[(i, j)] * &b_blk[(i, j)]);
        let x = row_dot(&d_blk, i, a, g) ^ row_dot(&c_blk, i, b, g) ^ parity(&cd);
        let y = row_dot(&b_blk, i, a, g) ^ row_dot(&a_blk, i, b, g) ^ parity(&ab_diag);
        new_a = (new_a << 1) | x;
        new_b = (new_b << 1) | y;
    }
    Ok(Char::new(new_a, new_b, g))
}

fn half_diff(x: &BigInt, y: u64) -> BigInt {
    (x - BigInt::from(y)) / 2i32
}

/// `κ(G, m) mod 8` for a single generator, the eighth root of unity in
///
/// `θ[G∘m](G·z, G·τ) = ζ8^κ·sqrt(det(Cτ + D))·exp(πi zᵗ(Cτ + D)⁻¹Cz)·θ[m](z, τ)`
///
/// with the principal square root of the generator's own determinant, see
/// [`super::transform::sqrt_cocycle`].
pub fn kappa_generator(gen: &Generator, ab: Char, g: usize) -> Result<i64> {
    let a = ab.a(g);
    let b = ab.b(g);
    let a_bits: Vec<u64> = (0..g).map(|i| bit(a, i, g)).collect();
    let b_bits: Vec<u64> = (0..g).map(|i| bit(b, i, g)).collect();
    let k = match gen {
        Generator::BlockDiag { u, det } => {
            // b ≡ U⁻¹·b' (mod 2) with b' the image; the carry gives a sign
            let image = char_transform(&gen.matrix(g)?, ab)?.b(g);
            let uinv = u.inv_unimodular()?;
            let mut sign = BigInt::zero();
            for i in (0..g).filter(|&i| a_bits[i] == 1) {
                let row = (0..g).fold(BigInt::zero(), |acc, j| {
                    acc + &uinv[(i, j)] * BigInt::from(bit(image, j, g))
                });
                sign += half_diff(&row, b_bits[i]);
            }
            let base = if *det == 1 { BigInt::zero() } else { BigInt::from(6) };
            base + sign * 4i32
        }
        Generator::Trig(s) => {
            // −aᵗSa − 2a·diag(S), then a sign from reducing b + diag(S) + Sa
            let image = char_transform(&gen.matrix(g)?, ab)?.b(g);
            let mut k = BigInt::zero();
            for i in (0..g).filter(|&i| a_bits[i] == 1) {
                let mut c = s[(i, i)].clone();
                for j in (0..g).filter(|&j| a_bits[j] == 1) {
                    k -= &s[(i, j)];
                    c += &s[(i, j)];
                }
                k -= &s[(i, i)] * 2i32;
                let shifted = c + BigInt::from(bit(image, i, g));
                k += half_diff(&shifted, b_bits[i]) * 4i32;
            }
            k
        }
        Generator::EmbedJ => BigInt::from(1 + 2 * (a_bits[0] & b_bits[0]) as i64),
        Generator::EmbedJInv => BigInt::from(7 + 6 * (a_bits[0] & b_bits[0]) as i64),
    };
    Ok((k % 8i32).to_i64().unwrap_or(0).rem_euclid(8))
}

/// `κ(M, m) mod 8` for `M = w_0·w_1·…·w_r`, accumulated from the right,
/// together with the image `M∘m`.
pub fn kappa_word(t: &Transform, ab: Char) -> Result<(Char, i64)> {
    let g = t.dim();
    let mut current = ab;
    let mut k = 0;
    for gen in t.word().iter().rev() {
        k += kappa_generator(gen, current, g)?;
        current = char_transform(&gen.matrix(g)?, current)?;
    }
    Ok((current, k.rem_euclid(8)))
}

/// `ζ8^k`.
pub fn zeta8_pow(k: i64, prec: u64) -> Acb {
    let k = k.rem_euclid(8);
    if k % 2 == 0 {
        return Acb::one().mul_i_pow(k / 2);
    }
    let h = Ball::from_dyadic(Dyadic::new(BigInt::from(1), -1)).sqrt(prec);
    Acb::new(h.clone(), h).mul_i_pow(k / 2)
}

/// `det(C·iI + D)` as an exact Gaussian integer.
pub(crate) fn det_at_i(m: &IntMat, g: usize, low_prec: u64) -> Result<(BigInt, BigInt)> {
    let iid = AcbMat::from_fn(g, g, |r, c| if r == c { Acb::i() } else { Acb::zero() });
    let mut prec = low_prec;
    for _ in 0..MAX_DOUBLINGS {
        let det = cocycle(m, &iid, prec)?.det(prec)?;
        if let (Some(re), Some(im)) = (det.re().unique_int(), det.im().unique_int()) {
            return Ok((re, im));
        }
        prec *= 2;
    }
    Err(ThetaError::InsufficientPrecision {
        stage: "calibration determinant",
        prec,
    })
}

/// Square root of a Gaussian integer: principal, except on the negative
/// real axis where it is `i·sqrt(|x|)`.
pub(crate) fn sqrt_gaussian(re: &BigInt, im: &BigInt, prec: u64) -> Acb {
    if im.is_zero() && re < &BigInt::zero() {
        let r = Ball::from_bigint(&-re).sqrt(prec);
        return Acb::new(Ball::zero(), r);
    }
    Acb::new(Ball::from_bigint(re), Ball::from_bigint(im)).sqrt(prec)
}

/// The first `k` in `0..8` with `x·ζ8^{−k}` certified in the cone
/// `Re > 2·|Im|`.
fn power_of_zeta8(x: &Acb, prec: u64) -> Option<i64> {
    let zeta_inv = zeta8_pow(-1, prec);
    let mut y = x.clone();
    for k in 0..8 {
        let im2 = Ball::from_dyadic(Dyadic::from_mag(&y.im().mag_upper())).mul_2exp(1);
        if y.re().is_positive() && y.re().gt(&im2) {
            return Some(k);
        }
        y = y.mul(&zeta_inv, prec);
    }
    None
}

/// `κ` in `0..8` such that
/// `θ[M∘0](0, M·τ) = ζ8^κ·sqrt(det(Cτ + D))·θ_{0,0}(0, τ)` at `τ = iI`,
/// with the square root taken as in [`sqrt_gaussian`].
pub fn transform_kappa(m: &IntMat) -> Result<i64> {
    transform_kappa_with_params(m, &ThetaParams::default())
}

pub fn transform_kappa_with_params(m: &IntMat, params: &ThetaParams) -> Result<i64> {
    let n = m.ensure_square()?;
    if n % 2 != 0 {
        return Err(ThetaError::InvalidDimension {
            expected: n + 1,
            got: n,
        });
    }
    if !super::sp2gz::is_symplectic(m) {
        return Err(ThetaError::NotSymplectic);
    }
    let g = n / 2;
    let (det_re, det_im) = det_at_i(m, g, params.low_prec)?;
    let ab = char_transform(m, Char(0))?;
    let iid = AcbMat::from_fn(g, g, |r, c| if r == c { Acb::i() } else { Acb::zero() });
    let zero = vec![vec![Acb::zero(); g]];

    let mut prec = params.low_prec;
    for _ in 0..MAX_DOUBLINGS {
        let tau1 = siegel_transform(m, &iid, prec)?;
        let num = naive_ind(ab, &zero, &tau1, prec)?;
        let th0 = naive_00(&zero, &iid, prec)?;
        let den = sqrt_gaussian(&det_re, &det_im, prec).mul(&th0[0], prec);
        let x = num[0].div(&den, prec);
        if let Some(k) = power_of_zeta8(&x, prec) {
            let check = x.mul(&zeta8_pow(-k, prec), prec);
            if !check.overlaps(&Acb::one()) {
                return Err(ThetaError::NotRootOfUnity);
            }
            debug!(g, kappa = k, prec, "calibrated transformation");
            return Ok(k);
        }
        prec *= 2;
    }
    Err(ThetaError::InsufficientPrecision {
        stage: "kappa",
        prec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::siegel::sp2gz::{block_diag, embed_j, sp2gz_j, trig};

    #[test]
    fn test_char_transform_is_an_action() {
        let g = 2;
        let m1 = trig(&IntMat::from_i64_rows(&[vec![1, 1], vec![1, 0]]).unwrap()).unwrap();
        let m2 = embed_j(g);
        let m12 = m1.mul(&m2).unwrap();
        for ab in Char::all(g) {
            let lhs = char_transform(&m12, ab).unwrap();
            let rhs = char_transform(&m1, char_transform(&m2, ab).unwrap()).unwrap();
            assert_eq!(lhs, rhs);
        }
    }

    #[test]
    fn test_j_swaps_halves() {
        let g = 2;
        let j = sp2gz_j(g);
        assert_eq!(char_transform(&j, Char::new(0b10, 0b01, g)).unwrap(), Char::new(0b01, 0b10, g));
        // parity is preserved
        for ab in Char::all(g) {
            let t = char_transform(&j, ab).unwrap();
            assert_eq!(ab.is_even(g), t.is_even(g));
        }
    }

    #[test]
    fn test_trig_phase() {
        let s = IntMat::from_i64_rows(&[vec![1]]).unwrap();
        let gen = Generator::Trig(s);
        assert_eq!(kappa_generator(&gen, Char::new(0, 1, 1), 1).unwrap(), 0);
        // (n + 1/2)² ≡ 1/4 (mod 2)
        assert_eq!(kappa_generator(&gen, Char::new(1, 0, 1), 1).unwrap(), 1);
        assert_eq!(kappa_generator(&gen, Char::new(1, 1, 1), 1).unwrap(), 1);
    }

    #[test]
    fn test_inversion_phase() {
        // θ_{1,1}(z/τ, −1/τ) = −i·sqrt(τ/i)·exp(πi z²/τ)·θ_{1,1}(z, τ)
        assert_eq!(kappa_generator(&Generator::EmbedJ, Char::new(1, 1, 1), 1).unwrap(), 3);
        assert_eq!(kappa_generator(&Generator::EmbedJInv, Char::new(1, 1, 1), 1).unwrap(), 5);
        assert_eq!(kappa_generator(&Generator::EmbedJ, Char::new(0, 1, 1), 1).unwrap(), 1);
        assert_eq!(kappa_generator(&Generator::EmbedJInv, Char::new(1, 0, 1), 1).unwrap(), 7);
    }

    #[test]
    fn test_block_diag_phases_compose() {
        let g = 2;
        let u = Generator::block_diag(IntMat::from_i64_rows(&[vec![1, 1], vec![0, -1]]).unwrap())
            .unwrap();
        let inv = u.inverse().unwrap();
        for ab in Char::all(g) {
            let image = char_transform(&u.matrix(g).unwrap(), ab).unwrap();
            let there = kappa_generator(&u, ab, g).unwrap();
            let back = kappa_generator(&inv, image, g).unwrap();
            // sqrt(−1)² = −1 from the two determinants
            assert_eq!((there + back).rem_euclid(8), 4, "{:?}", ab);
        }
    }

    #[test]
    fn test_zeta8_powers() {
        let prec = 80;
        let z = zeta8_pow(1, prec);
        assert!(z.sqr(prec).overlaps(&Acb::i()));
        assert!(zeta8_pow(3, prec).mul(&zeta8_pow(-3, prec), prec).overlaps(&Acb::one()));
        assert!(zeta8_pow(6, prec).overlaps(&Acb::i().neg()));
    }

    #[test]
    fn test_kappa_of_generators() {
        let u = IntMat::from_i64_rows(&[vec![1, 1], vec![0, 1]]).unwrap();
        assert_eq!(transform_kappa(&block_diag(&u).unwrap()).unwrap() % 4, 0);
        let s = IntMat::from_i64_rows(&[vec![0, 1], vec![1, 0]]).unwrap();
        assert_eq!(transform_kappa(&trig(&s).unwrap()).unwrap(), 0);
        // θ(0, −1/τ) = sqrt(−iτ)·θ(0, τ), and sqrt(−i)·sqrt(i) = 1 at τ = i
        let k = transform_kappa(&sp2gz_j(1)).unwrap();
        assert_eq!(k % 4, 1);
    }

    #[test]
    fn test_kappa_matches_word() {
        let g = 2;
        let mut t = Transform::identity(g);
        t.push_left(Generator::Trig(IntMat::from_i64_rows(&[vec![1, 0], vec![0, -1]]).unwrap()))
            .unwrap();
        t.push_left(Generator::EmbedJ).unwrap();
        t.push_left(
            Generator::block_diag(IntMat::from_i64_rows(&[vec![1, 1], vec![0, -1]]).unwrap())
                .unwrap(),
        )
        .unwrap();
        t.push_left(Generator::Trig(IntMat::from_i64_rows(&[vec![0, 1], vec![1, 1]]).unwrap()))
            .unwrap();
        let kappa = transform_kappa(t.mat()).unwrap();
        let (_, word) = kappa_word(&t, Char(0)).unwrap();
        assert_eq!(kappa.rem_euclid(4), word.rem_euclid(4));
    }

    #[test]
    fn test_rejects_non_symplectic() {
        let m = IntMat::from_i64_rows(&[vec![2, 0], vec![0, 1]]).unwrap();
        assert_eq!(transform_kappa(&m), Err(ThetaError::NotSymplectic));
    }
}
