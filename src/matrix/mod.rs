//! Dense row-major matrices over balls, complex balls and big integers.

pub mod acb_mat;
pub mod ball_mat;
pub mod int_mat;
pub mod view;

use std::ops::{Index, IndexMut};

use crate::error::{Result, ThetaError};

pub use view::MatView;

#[derive(Clone, Debug, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

pub type BallMat = Matrix<crate::ball::Ball>;
pub type AcbMat = Matrix<crate::ball::Acb>;
pub type IntMat = Matrix<num_bigint::BigInt>;

impl<T: Clone> Matrix<T> {
    pub fn from_elem(rows: usize, cols: usize, elem: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![elem; rows * cols],
        }
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(nrows * ncols);
        for row in rows {
            if row.len() != ncols {
                return Err(ThetaError::InvalidDimension {
                    expected: ncols,
                    got: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            rows: nrows,
            cols: ncols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Side length of a square matrix.
    pub fn ensure_square(&self) -> Result<usize> {
        if self.is_square() {
            Ok(self.rows)
        } else {
            Err(ThetaError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn column(&self, j: usize) -> Vec<T> {
        (0..self.rows).map(|i| self[(i, j)].clone()).collect()
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self[(j, i)].clone())
    }

    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    pub fn view(&self, row0: usize, col0: usize, rows: usize, cols: usize) -> MatView<'_, T> {
        MatView::new(self, row0, col0, rows, cols)
    }

    /// Copies `block` into `self` with its top-left corner at `(row0, col0)`.
    pub fn set_block(&mut self, row0: usize, col0: usize, block: &Matrix<T>) {
        for i in 0..block.rows {
            for j in 0..block.cols {
                self[(row0 + i, col0 + j)] = block[(i, j)].clone();
            }
        }
    }

    pub(crate) fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for j in 0..self.cols {
            self.data.swap(a * self.cols + j, b * self.cols + j);
        }
    }

    pub(crate) fn check_same_shape(&self, other: &Matrix<T>) -> Result<()> {
        if self.rows != other.rows {
            return Err(ThetaError::InvalidDimension {
                expected: self.rows,
                got: other.rows,
            });
        }
        if self.cols != other.cols {
            return Err(ThetaError::InvalidDimension {
                expected: self.cols,
                got: other.cols,
            });
        }
        Ok(())
    }

    pub(crate) fn check_product<U>(&self, other: &Matrix<U>) -> Result<()> {
        if self.cols != other.rows {
            return Err(ThetaError::InvalidDimension {
                expected: self.cols,
                got: other.rows,
            });
        }
        Ok(())
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.data[i * self.cols + j]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        &mut self.data[i * self.cols + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let result = Matrix::from_rows(vec![vec![1, 2], vec![3]]);
        assert!(matches!(
            result,
            Err(ThetaError::InvalidDimension { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_transpose_and_blocks() {
        let m = Matrix::from_fn(2, 3, |i, j| 10 * i + j);
        let t = m.transpose();
        assert_eq!(t.rows(), 3);
        assert_eq!(t[(2, 1)], 12);
        let mut big = Matrix::from_elem(4, 4, 0usize);
        big.set_block(1, 1, &m);
        assert_eq!(big[(2, 3)], 12);
        assert!(m.ensure_square().is_err());
    }
}
