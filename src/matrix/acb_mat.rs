use rand::Rng;

use crate::ball::Acb;
use crate::error::{Result, ThetaError};

use super::{AcbMat, BallMat};

impl AcbMat {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::from_elem(rows, cols, Acb::zero())
    }

    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { Acb::one() } else { Acb::zero() })
    }

    pub fn from_real_imag(re: &BallMat, im: &BallMat) -> Result<Self> {
        re.check_same_shape(im)?;
        Ok(Self::from_fn(re.rows(), re.cols(), |i, j| {
            Acb::new(re[(i, j)].clone(), im[(i, j)].clone())
        }))
    }

    pub fn from_real(re: &BallMat) -> Self {
        re.map(|x| Acb::from_real(x.clone()))
    }

    /// Builds an exact matrix from `(re, im)` pairs.
    pub fn from_c64_rows(rows: &[Vec<(f64, f64)>]) -> Result<Self> {
        Self::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|&(x, y)| Acb::from_f64(x, y)).collect())
                .collect(),
        )
    }

    pub fn real_part(&self) -> BallMat {
        self.map(|z| z.re().clone())
    }

    pub fn imag_part(&self) -> BallMat {
        self.map(|z| z.im().clone())
    }

    pub fn add(&self, other: &AcbMat, prec: u64) -> Result<AcbMat> {
        self.check_same_shape(other)?;
        Ok(Self::from_fn(self.rows(), self.cols(), |i, j| {
            self[(i, j)].add(&other[(i, j)], prec)
        }))
    }

    pub fn sub(&self, other: &AcbMat, prec: u64) -> Result<AcbMat> {
        self.check_same_shape(other)?;
        Ok(Self::from_fn(self.rows(), self.cols(), |i, j| {
            self[(i, j)].sub(&other[(i, j)], prec)
        }))
    }

    pub fn mul(&self, other: &AcbMat, prec: u64) -> Result<AcbMat> {
        self.check_product(other)?;
        Ok(Self::from_fn(self.rows(), other.cols(), |i, j| {
            (0..self.cols()).fold(Acb::zero(), |acc, k| {
                acc.add(&self[(i, k)].mul(&other[(k, j)], prec), prec)
            })
        }))
    }

    pub fn scale(&self, c: &Acb, prec: u64) -> AcbMat {
        self.map(|x| x.mul(c, prec))
    }

    pub fn mul_2exp(&self, e: i64) -> AcbMat {
        self.map(|x| x.mul_2exp(e))
    }

    pub fn mul_vec(&self, v: &[Acb], prec: u64) -> Vec<Acb> {
        (0..self.rows())
            .map(|i| {
                self.row(i)
                    .iter()
                    .zip(v)
                    .fold(Acb::zero(), |acc, (a, b)| acc.add(&a.mul(b, prec), prec))
            })
            .collect()
    }

    /// Row-echelon elimination with certified non-zero pivots. Returns the
    /// reduced matrices and the sign of the row permutation, or `None`.
    fn eliminate(&self, rhs: Option<AcbMat>, prec: u64) -> Option<(AcbMat, Option<AcbMat>, i64)> {
        let n = self.rows();
        let mut a = self.clone();
        let mut b = rhs;
        let mut sign = 1;
        for col in 0..n {
            let pivot = (col..n)
                .filter(|&r| !a[(r, col)].contains_zero())
                .max_by_key(|&r| a[(r, col)].mag_lower())?;
            if pivot != col {
                a.swap_rows(col, pivot);
                if let Some(b) = b.as_mut() {
                    b.swap_rows(col, pivot);
                }
                sign = -sign;
            }
            let p = a[(col, col)].clone();
            for r in col + 1..n {
                let f = a[(r, col)].div(&p, prec);
                for j in col..n {
                    let d = f.mul(&a[(col, j)], prec);
                    a[(r, j)] = a[(r, j)].sub(&d, prec);
                }
                if let Some(b) = b.as_mut() {
                    for j in 0..b.cols() {
                        let d = f.mul(&b[(col, j)], prec);
                        b[(r, j)] = b[(r, j)].sub(&d, prec);
                    }
                }
            }
        }
        Some((a, b, sign))
    }

    /// Determinant; indeterminate when elimination finds no usable pivot.
    pub fn det(&self, prec: u64) -> Result<Acb> {
        let n = self.ensure_square()?;
        let wp = prec + 10;
        Ok(match self.eliminate(None, wp) {
            Some((a, _, sign)) => (0..n)
                .fold(Acb::from_int(sign), |acc, i| acc.mul(&a[(i, i)], wp))
                .round(prec),
            None if n <= 3 => self.det_cofactor(wp).round(prec),
            None => Acb::indeterminate(),
        })
    }

    /// Laplace expansion along the first row.
    fn det_cofactor(&self, prec: u64) -> Acb {
        let n = self.rows();
        match n {
            0 => Acb::one(),
            1 => self[(0, 0)].clone(),
            _ => (0..n).fold(Acb::zero(), |acc, j| {
                let minor = AcbMat::from_fn(n - 1, n - 1, |r, c| {
                    self[(r + 1, if c < j { c } else { c + 1 })].clone()
                });
                let term = self[(0, j)].mul(&minor.det_cofactor(prec), prec);
                if j % 2 == 0 {
                    acc.add(&term, prec)
                } else {
                    acc.sub(&term, prec)
                }
            }),
        }
    }

    /// Inverse via elimination and back substitution; `None` when no
    /// certified pivot exists.
    pub fn inv(&self, prec: u64) -> Option<AcbMat> {
        let n = self.ensure_square().ok()?;
        let (a, b, _) = self.eliminate(Some(AcbMat::identity(n)), prec)?;
        let mut b = b?;
        for col in (0..n).rev() {
            let p = a[(col, col)].clone();
            for j in 0..n {
                let mut s = b[(col, j)].clone();
                for k in col + 1..n {
                    s = s.sub(&a[(col, k)].mul(&b[(k, j)], prec), prec);
                }
                b[(col, j)] = s.div(&p, prec);
            }
        }
        Some(b)
    }

    /// Fails unless every entry overlaps its mirror image.
    pub fn check_symmetric(&self) -> Result<()> {
        let n = self.ensure_square()?;
        for i in 0..n {
            for j in 0..i {
                if !self[(i, j)].overlaps(&self[(j, i)]) {
                    return Err(ThetaError::NotSymmetric);
                }
            }
        }
        Ok(())
    }

    pub fn overlaps(&self, other: &AcbMat) -> bool {
        self.check_same_shape(other).is_ok()
            && (0..self.rows())
                .all(|i| (0..self.cols()).all(|j| self[(i, j)].overlaps(&other[(i, j)])))
    }

    pub fn is_finite(&self) -> bool {
        (0..self.rows()).all(|i| self.row(i).iter().all(Acb::is_finite))
    }

    /// Random exact period matrix with `Re` entries in `[-1/2, 1/2]` and
    /// imaginary part `AᵗA + I` for a random `A` with entries in `[-1, 1]`.
    pub fn random_siegel<R: Rng>(g: usize, rng: &mut R) -> Self {
        let a: Vec<Vec<f64>> = (0..g)
            .map(|_| (0..g).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect();
        let mut re = vec![vec![0.0; g]; g];
        let mut im = vec![vec![0.0; g]; g];
        for i in 0..g {
            for j in 0..=i {
                let x = rng.gen_range(-0.5..0.5);
                let y: f64 = (0..g).map(|k| a[k][i] * a[k][j]).sum::<f64>()
                    + if i == j { 1.0 } else { 0.0 };
                re[i][j] = x;
                re[j][i] = x;
                im[i][j] = y;
                im[j][i] = y;
            }
        }
        Self::from_fn(g, g, |i, j| Acb::from_f64(re[i][j], im[i][j]))
    }

    /// Scales the imaginary part of the last diagonal entry by `2^e`.
    pub fn scale_last_imag_diag(&self, e: i64) -> AcbMat {
        let mut out = self.clone();
        if let Some(last) = self.rows().checked_sub(1) {
            let z = &self[(last, last)];
            out[(last, last)] = Acb::new(z.re().clone(), z.im().mul_2exp(e));
        }
        out
    }

    pub fn to_c64(&self) -> Vec<Vec<(f64, f64)>> {
        (0..self.rows())
            .map(|i| self.row(i).iter().map(Acb::to_c64).collect())
            .collect()
    }
}

/// Exact complex ball of a real ball.
impl From<&BallMat> for AcbMat {
    fn from(m: &BallMat) -> Self {
        AcbMat::from_real(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const PREC: u64 = 128;

    #[test]
    fn test_det_and_inverse() {
        let m = AcbMat::from_c64_rows(&[
            vec![(1.0, 2.0), (0.5, 0.0)],
            vec![(0.0, -1.0), (3.0, 1.0)],
        ])
        .unwrap();
        // (1+2i)(3+i) - 0.5(-i) = 1 + 7i + 0.5i
        let det = m.det(PREC).unwrap();
        assert!(det.contains(&Acb::from_f64(1.0, 7.5)));
        let inv = m.inv(PREC).unwrap();
        let prod = m.mul(&inv, PREC).unwrap();
        assert!(prod.overlaps(&AcbMat::identity(2)));
    }

    #[test]
    fn test_random_siegel_is_symmetric() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let tau = AcbMat::random_siegel(3, &mut rng);
        assert!(tau.check_symmetric().is_ok());
        assert!(tau.imag_part()[(0, 0)].is_positive());
    }

    #[test]
    fn test_asymmetric_rejected() {
        let m = AcbMat::from_c64_rows(&[
            vec![(0.0, 1.0), (0.25, 0.0)],
            vec![(0.0, 0.0), (0.0, 1.0)],
        ])
        .unwrap();
        assert_eq!(m.check_symmetric(), Err(ThetaError::NotSymmetric));
    }
}
