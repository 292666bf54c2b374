//! Elements of `Sp_{2g}(ℤ)` and the generators the reduction is built from.

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::error::{Result, ThetaError};
use crate::matrix::IntMat;

/// `J = [[0, I], [−I, 0]]`.
pub fn sp2gz_j(g: usize) -> IntMat {
    let mut m = IntMat::zeros(2 * g, 2 * g);
    for i in 0..g {
        m[(i, g + i)] = BigInt::one();
        m[(g + i, i)] = -BigInt::one();
    }
    m
}

/// `[[U, 0], [0, U⁻ᵗ]]` for unimodular `U`, acting as `τ ↦ U τ Uᵗ`.
pub fn block_diag(u: &IntMat) -> Result<IntMat> {
    let g = u.ensure_square()?;
    let uinv_t = u.inv_unimodular()?.transpose();
    IntMat::from_blocks(u, &IntMat::zeros(g, g), &IntMat::zeros(g, g), &uinv_t)
}

/// `[[I, S], [0, I]]` for symmetric `S`, acting as `τ ↦ τ + S`.
pub fn trig(s: &IntMat) -> Result<IntMat> {
    let g = s.ensure_square()?;
    if *s != s.transpose() {
        return Err(ThetaError::NotSymmetric);
    }
    IntMat::from_blocks(&IntMat::identity(g), s, &IntMat::zeros(g, g), &IntMat::identity(g))
}

/// `J` on the first coordinate, identity on the others.
pub fn embed_j(g: usize) -> IntMat {
    let mut m = IntMat::identity(2 * g);
    if g == 0 {
        return m;
    }
    m[(0, 0)] = BigInt::zero();
    m[(g, g)] = BigInt::zero();
    m[(0, g)] = BigInt::one();
    m[(g, 0)] = -BigInt::one();
    m
}

pub fn embed_j_inv(g: usize) -> IntMat {
    let mut m = embed_j(g);
    if g > 0 {
        m[(0, g)] = -BigInt::one();
        m[(g, 0)] = BigInt::one();
    }
    m
}

/// `MᵗJM = J`.
pub fn is_symplectic(m: &IntMat) -> bool {
    let n = m.rows();
    if !m.is_square() || n % 2 != 0 {
        return false;
    }
    let j = sp2gz_j(n / 2);
    m.transpose()
        .mul(&j)
        .and_then(|x| x.mul(m))
        .map_or(false, |x| x == j)
}

/// `M⁻¹ = [[Dᵗ, −Bᵗ], [−Cᵗ, Aᵗ]]`.
pub fn sp2gz_inv(m: &IntMat) -> Result<IntMat> {
    if !is_symplectic(m) {
        return Err(ThetaError::NotSymplectic);
    }
    let (a, b, c, d) = m.blocks()?;
    IntMat::from_blocks(
        &d.transpose(),
        &b.transpose().neg(),
        &c.transpose().neg(),
        &a.transpose(),
    )
}

/// One step of a reduction.
#[derive(Clone, Debug, PartialEq)]
pub enum Generator {
    BlockDiag { u: IntMat, det: i64 },
    Trig(IntMat),
    EmbedJ,
    EmbedJInv,
}

impl Generator {
    pub fn block_diag(u: IntMat) -> Result<Self> {
        let det = u.det()?;
        let det = if det == BigInt::one() {
            1
        } else if det == -BigInt::one() {
            -1
        } else {
            return Err(ThetaError::InvalidParameters(format!(
                "matrix with determinant {} is not unimodular",
                det
            )));
        };
        Ok(Generator::BlockDiag { u, det })
    }

    pub fn matrix(&self, g: usize) -> Result<IntMat> {
        match self {
            Generator::BlockDiag { u, .. } => block_diag(u),
            Generator::Trig(s) => trig(s),
            Generator::EmbedJ => Ok(embed_j(g)),
            Generator::EmbedJInv => Ok(embed_j_inv(g)),
        }
    }

    pub fn inverse(&self) -> Result<Self> {
        Ok(match self {
            Generator::BlockDiag { u, det } => Generator::BlockDiag {
                u: u.inv_unimodular()?,
                det: *det,
            },
            Generator::Trig(s) => Generator::Trig(s.neg()),
            Generator::EmbedJ => Generator::EmbedJInv,
            Generator::EmbedJInv => Generator::EmbedJ,
        })
    }
}

/// A symplectic matrix together with a factorization `M = w_0·w_1·…`.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    g: usize,
    mat: IntMat,
    word: Vec<Generator>,
}

impl Transform {
    pub fn identity(g: usize) -> Self {
        Self {
            g,
            mat: IntMat::identity(2 * g),
            word: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.g
    }

    pub fn mat(&self) -> &IntMat {
        &self.mat
    }

    pub fn word(&self) -> &[Generator] {
        &self.word
    }

    /// `M ← G·M`.
    pub fn push_left(&mut self, gen: Generator) -> Result<()> {
        self.mat = gen.matrix(self.g)?.mul(&self.mat)?;
        self.word.insert(0, gen);
        Ok(())
    }

    pub fn inverse(&self) -> Result<Self> {
        let word = self
            .word
            .iter()
            .rev()
            .map(Generator::inverse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            g: self.g,
            mat: sp2gz_inv(&self.mat)?,
            word,
        })
    }
}
