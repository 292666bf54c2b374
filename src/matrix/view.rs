use super::Matrix;

/// Read-only rectangular window into an owned matrix.
#[derive(Clone, Copy, Debug)]
pub struct MatView<'a, T> {
    mat: &'a Matrix<T>,
    row0: usize,
    col0: usize,
    rows: usize,
    cols: usize,
}

impl<'a, T: Clone> MatView<'a, T> {
    /// Panics if the window does not fit inside `mat`.
    pub fn new(mat: &'a Matrix<T>, row0: usize, col0: usize, rows: usize, cols: usize) -> Self {
        assert!(
            row0 + rows <= mat.rows() && col0 + cols <= mat.cols(),
            "window {}x{} at ({}, {}) exceeds {}x{} matrix",
            rows,
            cols,
            row0,
            col0,
            mat.rows(),
            mat.cols()
        );
        Self {
            mat,
            row0,
            col0,
            rows,
            cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> &'a T {
        &self.mat[(self.row0 + i, self.col0 + j)]
    }

    pub fn to_matrix(&self) -> Matrix<T> {
        Matrix::from_fn(self.rows, self.cols, |i, j| self.get(i, j).clone())
    }
}
