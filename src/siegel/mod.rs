//! Symplectic reduction of the period matrix.
//!
//! Theta values at `τ` are obtained from values at a reduced `τ' = M·τ`,
//! where the lattice sums are short, through the squared transformation law
//! with the phases tracked along the generators of `M`.

pub mod char_transform;
pub mod lll;
pub mod reduce;
pub mod sp2gz;
pub mod transform;

use tracing::debug;

use crate::ball::Acb;
use crate::characteristic::Char;
use crate::error::Result;
use crate::matrix::AcbMat;
use crate::params::ThetaParams;
use crate::naive::naive_all_with_params;
use crate::ql::ql_all_sqr_with_params;

pub use char_transform::{
    char_transform, kappa_generator, kappa_word, transform_kappa, transform_kappa_with_params,
    zeta8_pow,
};
pub use lll::lll_reduce;
pub use reduce::siegel_reduce;
pub use sp2gz::{block_diag, embed_j, embed_j_inv, is_symplectic, sp2gz_inv, sp2gz_j, trig, Generator, Transform};
pub use transform::{
    automorphy, automorphy_sqr, cocycle, siegel_transform, siegel_transform_z, sqrt_cocycle,
};

/// A period matrix together with its reduction, shared by every `z`.
#[derive(Clone, Debug)]
pub struct ReducedTau {
    tau: AcbMat,
    transform: Transform,
    inverse: Transform,
    reduced: AcbMat,
    /// `(N∘m, κ(N, m))` for every `m`, with `N = M⁻¹`.
    phases: Vec<(Char, i64)>,
}

impl ReducedTau {
    pub fn new(tau: &AcbMat, prec: u64, params: &ThetaParams) -> Result<Self> {
        let (transform, reduced) = siegel_reduce(tau, prec, params)?;
        let inverse = transform.inverse()?;
        let phases = Char::all(tau.rows())
            .map(|m| kappa_word(&inverse, m))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            tau: tau.clone(),
            transform,
            inverse,
            reduced,
            phases,
        })
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn reduced(&self) -> &AcbMat {
        &self.reduced
    }

    pub fn is_trivial(&self) -> bool {
        self.transform.word().is_empty()
    }

    /// All `θ²_{a,b}(z, τ)`, indexed by `(a << g) | b`.
    ///
    /// With `N = M⁻¹`, `z' = M·z` and `m = N∘m'`,
    /// `θ²[m](z, τ) = i^{κ(N, m')}·det(C_N τ' + D_N)·exp(2πi z'ᵗ(C_N τ' + D_N)⁻¹C_N z')·θ²[m'](z', τ')`.
    pub fn all_sqr(&self, z: &[Acb], prec: u64, params: &ThetaParams) -> Result<Vec<Acb>> {
        if self.is_trivial() {
            return ql_all_sqr_with_params(z, &self.tau, prec, params);
        }
        let wp = prec + params.guard_bits;
        let new_z = self.reduced_z(z, wp)?;
        let sq = ql_all_sqr_with_params(&new_z, &self.reduced, wp, params)?;
        let factor = automorphy_sqr(self.inverse.mat(), &new_z, &self.reduced, wp)?;
        Ok(self.undo(&sq, &factor, prec, wp, |x, k| x.mul_i_pow(k)))
    }

    /// All `θ_{a,b}(z, τ)` by direct summation at the reduced matrix, carried
    /// back with `ζ8^{κ(N, m')}·sqrt(det(C_N τ' + D_N))·exp(πi z'ᵗ(C_N τ' + D_N)⁻¹C_N z')`.
    pub fn naive_all(&self, z: &[Acb], prec: u64, params: &ThetaParams) -> Result<Vec<Acb>> {
        if self.is_trivial() {
            return naive_all_with_params(&[z.to_vec()], &self.tau, prec, params);
        }
        let new_z = self.reduced_z(z, prec)?;
        let values = naive_all_with_params(&[new_z.clone()], &self.reduced, prec, params)?;
        let factor = automorphy(&self.inverse, &new_z, &self.reduced, prec)?;
        Ok(self.undo(&values, &factor, prec, prec, |x, k| {
            x.mul(&zeta8_pow(k, prec), prec)
        }))
    }

    fn reduced_z(&self, z: &[Acb], prec: u64) -> Result<Vec<Acb>> {
        let (new_z, _) = siegel_transform_z(self.transform.mat(), z, &self.tau, prec)?;
        Ok(new_z)
    }

    fn undo(
        &self,
        values: &[Acb],
        factor: &Acb,
        prec: u64,
        wp: u64,
        phase: impl Fn(&Acb, i64) -> Acb,
    ) -> Vec<Acb> {
        let mut out = vec![Acb::zero(); values.len()];
        for (x, (target, k)) in values.iter().zip(&self.phases) {
            out[target.0 as usize] = phase(&x.mul(factor, wp), *k).round(prec);
        }
        debug!(
            g = self.tau.rows(),
            generators = self.inverse.word().len(),
            "undid reduction"
        );
        out
    }
}
