use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::ball::{Acb, Ball};
use crate::error::{Result, ThetaError};

use super::{AcbMat, BallMat, IntMat};

impl IntMat {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::from_elem(rows, cols, BigInt::zero())
    }

    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { BigInt::one() } else { BigInt::zero() })
    }

    pub fn from_i64_rows(rows: &[Vec<i64>]) -> Result<Self> {
        Self::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|&x| BigInt::from(x)).collect())
                .collect(),
        )
    }

    pub fn mul(&self, other: &IntMat) -> Result<IntMat> {
        self.check_product(other)?;
        Ok(Self::from_fn(self.rows(), other.cols(), |i, j| {
            (0..self.cols())
                .map(|k| &self[(i, k)] * &other[(k, j)])
                .sum()
        }))
    }

    pub fn add(&self, other: &IntMat) -> Result<IntMat> {
        self.check_same_shape(other)?;
        Ok(Self::from_fn(self.rows(), self.cols(), |i, j| {
            &self[(i, j)] + &other[(i, j)]
        }))
    }

    pub fn neg(&self) -> IntMat {
        self.map(|x| -x)
    }

    pub fn is_zero(&self) -> bool {
        (0..self.rows()).all(|i| self.row(i).iter().all(Zero::is_zero))
    }

    pub fn is_identity(&self) -> bool {
        self.is_square() && *self == IntMat::identity(self.rows())
    }

    pub fn is_diagonal(&self) -> bool {
        (0..self.rows()).all(|i| (0..self.cols()).all(|j| i == j || self[(i, j)].is_zero()))
    }

    /// Fraction-free (Bareiss) determinant.
    pub fn det(&self) -> Result<BigInt> {
        let n = self.ensure_square()?;
        if n == 0 {
            return Ok(BigInt::one());
        }
        let mut a = self.clone();
        let mut sign = BigInt::one();
        let mut prev = BigInt::one();
        for k in 0..n - 1 {
            if a[(k, k)].is_zero() {
                match (k + 1..n).find(|&r| !a[(r, k)].is_zero()) {
                    Some(r) => {
                        a.swap_rows(k, r);
                        sign = -sign;
                    }
                    None => return Ok(BigInt::zero()),
                }
            }
            for i in k + 1..n {
                for j in k + 1..n {
                    let v = &a[(i, j)] * &a[(k, k)] - &a[(i, k)] * &a[(k, j)];
                    a[(i, j)] = v / &prev;
                }
            }
            prev = a[(k, k)].clone();
        }
        Ok(sign * &a[(n - 1, n - 1)])
    }

    /// Inverse of a unimodular matrix through its adjugate.
    pub fn inv_unimodular(&self) -> Result<IntMat> {
        let n = self.ensure_square()?;
        let det = self.det()?;
        if det.abs() != BigInt::one() {
            return Err(ThetaError::InvalidParameters(format!(
                "matrix with determinant {} is not unimodular",
                det
            )));
        }
        let mut inv = IntMat::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                let minor = IntMat::from_fn(n - 1, n - 1, |r, c| {
                    let rr = if r < j { r } else { r + 1 };
                    let cc = if c < i { c } else { c + 1 };
                    self[(rr, cc)].clone()
                });
                let cof = minor.det()?;
                let cof = if (i + j) % 2 == 0 { cof } else { -cof };
                inv[(i, j)] = cof * &det;
            }
        }
        Ok(inv)
    }

    /// Top-left `g x g` blocks `(A, B, C, D)` of a `2g x 2g` matrix.
    pub fn blocks(&self) -> Result<(IntMat, IntMat, IntMat, IntMat)> {
        let n = self.ensure_square()?;
        if n % 2 != 0 {
            return Err(ThetaError::InvalidDimension {
                expected: n + 1,
                got: n,
            });
        }
        let g = n / 2;
        Ok((
            self.view(0, 0, g, g).to_matrix(),
            self.view(0, g, g, g).to_matrix(),
            self.view(g, 0, g, g).to_matrix(),
            self.view(g, g, g, g).to_matrix(),
        ))
    }

    pub fn from_blocks(a: &IntMat, b: &IntMat, c: &IntMat, d: &IntMat) -> Result<IntMat> {
        let g = a.ensure_square()?;
        for m in [b, c, d] {
            if m.rows() != g || m.cols() != g {
                return Err(ThetaError::InvalidDimension {
                    expected: g,
                    got: m.rows().max(m.cols()),
                });
            }
        }
        let mut out = IntMat::zeros(2 * g, 2 * g);
        out.set_block(0, 0, a);
        out.set_block(0, g, b);
        out.set_block(g, 0, c);
        out.set_block(g, g, d);
        Ok(out)
    }

    pub fn to_ball_mat(&self) -> BallMat {
        self.map(Ball::from_bigint)
    }

    pub fn to_acb_mat(&self) -> AcbMat {
        self.map(|x| Acb::from_real(Ball::from_bigint(x)))
    }

    /// Entries as `i64` when they all fit.
    pub fn to_i64(&self) -> Option<Vec<Vec<i64>>> {
        use num_traits::ToPrimitive;
        (0..self.rows())
            .map(|i| self.row(i).iter().map(ToPrimitive::to_i64).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_det_small() {
        let m = IntMat::from_i64_rows(&[vec![2, 1, 0], vec![1, 3, 1], vec![0, 1, 4]]).unwrap();
        assert_eq!(m.det().unwrap(), BigInt::from(18));
        let z = IntMat::from_i64_rows(&[vec![0, 1], vec![1, 0]]).unwrap();
        assert_eq!(z.det().unwrap(), BigInt::from(-1));
    }

    #[test]
    fn test_rejects_non_unimodular() {
        let m = IntMat::from_i64_rows(&[vec![2, 0], vec![0, 1]]).unwrap();
        assert!(m.inv_unimodular().is_err());
    }

    #[test]
    fn test_blocks_round_trip() {
        let m = IntMat::from_fn(4, 4, |i, j| BigInt::from(4 * i + j));
        let (a, b, c, d) = m.blocks().unwrap();
        assert_eq!(IntMat::from_blocks(&a, &b, &c, &d).unwrap(), m);
    }

    proptest! {
        #[test]
        fn test_unimodular_inverse(a in -5i64..5, b in -5i64..5, c in -5i64..5) {
            // product of elementary matrices is unimodular
            let l = IntMat::from_i64_rows(&[vec![1, 0, 0], vec![a, 1, 0], vec![b, c, 1]]).unwrap();
            let u = IntMat::from_i64_rows(&[vec![1, c, a], vec![0, -1, b], vec![0, 0, 1]]).unwrap();
            let m = l.mul(&u).unwrap();
            let inv = m.inv_unimodular().unwrap();
            prop_assert!(m.mul(&inv).unwrap().is_identity());
        }
    }
}
