use crate::ball::{exp, exp_pi_i, Acb, Ball, Mag};
use crate::distance::{nearest_plane, offset};
use crate::error::Result;
use crate::matrix::{AcbMat, BallMat};

/// A point `z` moved by a lattice vector `τ·m`, with what is needed to
/// undo the move.
///
/// For every `a`, `θ_{a,0}(z, τ) = c·θ_{a,0}(z + τ·m, τ)`; with a `b`
/// characteristic an extra sign `(−1)^{m·b}` appears. The terms of the sum
/// at the new point satisfy `|term_n| = u·exp(−‖C·n − v‖²)`.
#[derive(Clone, Debug)]
pub struct ReducedZ {
    pub z: Vec<Acb>,
    pub shift: Vec<i64>,
    pub c: Acb,
    pub u: Mag,
    pub offset: Vec<Ball>,
}

impl ReducedZ {
    /// Leaves `z` in place.
    pub fn unshifted(z: &[Acb], c: &BallMat, yinv: &BallMat, prec: u64) -> Self {
        let v = offset(z, c, yinv, prec);
        Self {
            z: z.to_vec(),
            shift: vec![0; z.len()],
            c: Acb::one(),
            u: growth(&v, prec),
            offset: v,
        }
    }

    /// `(−1)^{m·b}` for a packed `b`.
    pub fn sign(&self, b: u64) -> i64 {
        let g = self.shift.len();
        let odd = (0..g)
            .filter(|&j| (b >> (g - 1 - j)) & 1 == 1)
            .map(|j| self.shift[j])
            .sum::<i64>()
            .rem_euclid(2);
        1 - 2 * odd
    }

    pub fn offset_norm(&self, prec: u64) -> Mag {
        self.offset
            .iter()
            .fold(Ball::zero(), |acc, x| acc.add(&x.sqr(prec), prec))
            .sqrt(prec)
            .mag_upper()
    }
}

/// `exp(‖v‖²)`, which equals `exp(π·yᵗY⁻¹y)`.
fn growth(v: &[Ball], prec: u64) -> Mag {
    let n2 = v.iter().fold(Ball::zero(), |acc, x| acc.add(&x.sqr(prec), prec));
    exp(&n2, prec).mag_upper()
}

/// Moves `z` by the lattice vector that brings `Y⁻¹·Im z` closest to zero in
/// the norm defined by `C`.
pub fn naive_reduce(
    z: &[Acb],
    tau: &AcbMat,
    c: &BallMat,
    yinv: &BallMat,
    prec: u64,
) -> Result<ReducedZ> {
    let g = z.len();
    let v = offset(z, c, yinv, prec);
    let m = nearest_plane(&v, c, prec)?;
    if m.iter().all(|&x| x == 0) {
        return Ok(ReducedZ {
            z: z.to_vec(),
            shift: m,
            c: Acb::one(),
            u: growth(&v, prec),
            offset: v,
        });
    }

    let mb: Vec<Acb> = m.iter().map(|&x| Acb::from_int(x)).collect();
    let tm = tau.mul_vec(&mb, prec);
    let new_z: Vec<Acb> = z.iter().zip(&tm).map(|(x, t)| x.add(t, prec)).collect();

    // c = exp(πi (mᵗτm + 2 mᵗz))
    let arg = (0..g).fold(Acb::zero(), |acc, j| {
        let t = tm[j].add(&z[j].mul_2exp(1), prec);
        acc.add(&t.mul_si(m[j], prec), prec)
    });
    let new_v = offset(&new_z, c, yinv, prec);
    Ok(ReducedZ {
        c: exp_pi_i(&arg, prec),
        u: growth(&new_v, prec),
        z: new_z,
        shift: m,
        offset: new_v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cholesky::eld_cho;

    const PREC: u64 = 128;

    #[test]
    fn test_reduction_shrinks_imaginary_part() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.1, 1.0), (0.2, 0.3)], vec![(0.2, 0.3), (-0.3, 1.2)]]).unwrap();
        let c = eld_cho(&tau, PREC).unwrap();
        let yinv = tau.imag_part().inv(PREC).unwrap();
        let z = vec![Acb::from_f64(0.3, 2.7), Acb::from_f64(-0.1, -3.1)];
        let r = naive_reduce(&z, &tau, &c, &yinv, PREC).unwrap();
        assert!(r.shift.iter().any(|&x| x != 0));
        let before = ReducedZ::unshifted(&z, &c, &yinv, PREC);
        assert!(r.u < before.u);
        assert!(r.offset_norm(PREC) < before.offset_norm(PREC));
    }

    #[test]
    fn test_sign() {
        let r = ReducedZ {
            z: vec![],
            shift: vec![1, 2, -1],
            c: Acb::one(),
            u: Mag::one(),
            offset: vec![],
        };
        assert_eq!(r.sign(0b100), -1);
        assert_eq!(r.sign(0b010), 1);
        assert_eq!(r.sign(0b101), 1);
    }
}
