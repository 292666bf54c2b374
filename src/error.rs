use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThetaError {
    #[error("Invalid dimension: expected {expected}, got {got}")]
    InvalidDimension {
        expected: usize,
        got: usize,
    },

    #[error("Matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("Period matrix is not symmetric")]
    NotSymmetric,

    #[error("Imaginary part is not certifiably positive definite at {prec} bits")]
    NotPositiveDefinite { prec: u64 },

    #[error("Matrix is not symplectic")]
    NotSymplectic,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Insufficient precision in {stage} at {prec} bits")]
    InsufficientPrecision { stage: &'static str, prec: u64 },

    #[error("Inconsistent ellipsoid interval [{min}, {max}] around centre {mid}")]
    InconsistentInterval { min: i64, mid: i64, max: i64 },

    #[error("Expected at most one lattice point, found {count}")]
    SeveralPoints { count: usize },

    #[error("Calibration ratio is not an eighth root of unity")]
    NotRootOfUnity,
}

impl ThetaError {
    /// Structural and invalid-input errors abort the computation; only
    /// precision shortfalls are retried.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ThetaError::InsufficientPrecision { .. })
    }
}

pub type Result<T> = std::result::Result<T, ThetaError>;
