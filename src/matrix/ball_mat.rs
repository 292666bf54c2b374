use crate::ball::{Ball, Mag};
use crate::error::Result;

use super::BallMat;

impl BallMat {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::from_elem(rows, cols, Ball::zero())
    }

    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { Ball::one() } else { Ball::zero() })
    }

    pub fn from_f64_rows(rows: &[Vec<f64>]) -> Result<Self> {
        Self::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|&x| Ball::from_f64(x)).collect())
                .collect(),
        )
    }

    pub fn add(&self, other: &BallMat, prec: u64) -> Result<BallMat> {
        self.check_same_shape(other)?;
        Ok(Self::from_fn(self.rows(), self.cols(), |i, j| {
            self[(i, j)].add(&other[(i, j)], prec)
        }))
    }

    pub fn sub(&self, other: &BallMat, prec: u64) -> Result<BallMat> {
        self.check_same_shape(other)?;
        Ok(Self::from_fn(self.rows(), self.cols(), |i, j| {
            self[(i, j)].sub(&other[(i, j)], prec)
        }))
    }

    pub fn mul(&self, other: &BallMat, prec: u64) -> Result<BallMat> {
        self.check_product(other)?;
        Ok(Self::from_fn(self.rows(), other.cols(), |i, j| {
            (0..self.cols()).fold(Ball::zero(), |acc, k| {
                acc.add(&self[(i, k)].mul(&other[(k, j)], prec), prec)
            })
        }))
    }

    pub fn scale(&self, c: &Ball, prec: u64) -> BallMat {
        self.map(|x| x.mul(c, prec))
    }

    pub fn mul_vec(&self, v: &[Ball], prec: u64) -> Vec<Ball> {
        (0..self.rows())
            .map(|i| {
                self.row(i)
                    .iter()
                    .zip(v)
                    .fold(Ball::zero(), |acc, (a, b)| acc.add(&a.mul(b, prec), prec))
            })
            .collect()
    }

    /// Inverse by Gauss-Jordan elimination; `None` when a pivot column has
    /// no certifiably non-zero entry.
    pub fn inv(&self, prec: u64) -> Option<BallMat> {
        let n = self.ensure_square().ok()?;
        let mut a = self.clone();
        let mut b = BallMat::identity(n);
        for col in 0..n {
            let pivot = (col..n)
                .filter(|&r| !a[(r, col)].contains_zero())
                .max_by_key(|&r| a[(r, col)].mag_lower())?;
            a.swap_rows(col, pivot);
            b.swap_rows(col, pivot);
            let p = a[(col, col)].clone();
            for j in 0..n {
                a[(col, j)] = a[(col, j)].div(&p, prec);
                b[(col, j)] = b[(col, j)].div(&p, prec);
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let f = a[(r, col)].clone();
                for j in 0..n {
                    let da = f.mul(&a[(col, j)], prec);
                    let db = f.mul(&b[(col, j)], prec);
                    a[(r, j)] = a[(r, j)].sub(&da, prec);
                    b[(r, j)] = b[(r, j)].sub(&db, prec);
                }
            }
        }
        Some(b)
    }

    /// Whether every entry overlaps its mirror image.
    pub fn overlaps_transpose(&self) -> bool {
        self.is_square()
            && (0..self.rows())
                .all(|i| (0..i).all(|j| self[(i, j)].overlaps(&self[(j, i)])))
    }

    /// Largest row sum of entry magnitudes, an upper bound of the infinity norm.
    pub fn norm_inf_upper(&self) -> Mag {
        (0..self.rows())
            .map(|i| {
                self.row(i)
                    .iter()
                    .fold(Mag::zero(), |acc, x| acc.add(&x.mag_upper()))
            })
            .max()
            .unwrap_or_default()
    }

    pub fn overlaps(&self, other: &BallMat) -> bool {
        self.check_same_shape(other).is_ok()
            && (0..self.rows())
                .all(|i| (0..self.cols()).all(|j| self[(i, j)].overlaps(&other[(i, j)])))
    }

    pub fn contains(&self, other: &BallMat) -> bool {
        self.check_same_shape(other).is_ok()
            && (0..self.rows())
                .all(|i| (0..self.cols()).all(|j| self[(i, j)].contains(&other[(i, j)])))
    }

    /// Midpoints as `f64`, for heuristics that need no certification.
    pub fn to_f64(&self) -> Vec<Vec<f64>> {
        (0..self.rows())
            .map(|i| self.row(i).iter().map(Ball::to_f64).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREC: u64 = 128;

    #[test]
    fn test_inverse_of_spd_matrix() {
        let m = BallMat::from_f64_rows(&[vec![4.0, 1.0], vec![1.0, 3.0]]).unwrap();
        let inv = m.inv(PREC).unwrap();
        let prod = m.mul(&inv, PREC).unwrap();
        assert!(prod.contains(&BallMat::identity(2)));
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        let m = BallMat::from_f64_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert!(m.inv(PREC).is_none());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = BallMat::zeros(2, 3);
        let b = BallMat::zeros(2, 3);
        assert!(a.mul(&b, PREC).is_err());
        assert!(a.add(&b, PREC).is_ok());
    }
}
