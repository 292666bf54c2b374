//! Certified evaluation of Riemann theta functions.
//!
//! Every value is a complex ball guaranteed to contain the exact result.
//! The period matrix is first moved towards the Siegel fundamental domain,
//! values at the reduced matrix come from either direct summation over an
//! ellipsoid of lattice points or the duplication formula, and the
//! transformation law carries them back.

pub mod ball;
pub mod characteristic;
pub mod cholesky;
pub mod distance;
pub mod ellipsoid;
pub mod error;
pub mod eval;
pub mod matrix;
pub mod naive;
pub mod params;
pub mod ql;
pub mod siegel;

pub use ball::{Acb, Ball, Dyadic, Mag};
pub use characteristic::Char;
pub use cholesky::{cho, eld_cho};
pub use distance::{dist_a0, dist_pt, sqr_dist};
pub use ellipsoid::Ellipsoid;
pub use error::{Result, ThetaError};
pub use eval::{
    theta_all, theta_all_many, theta_all_many_with_params, theta_all_sqr,
    theta_all_sqr_with_params, theta_all_with_params, theta_jets, theta_jets_with_params,
};
pub use matrix::{AcbMat, BallMat, IntMat, MatView, Matrix};
pub use naive::{naive_00, naive_0b, naive_0b_jet, naive_a0, naive_all, naive_ind, naive_term};
pub use params::ThetaParams;
pub use ql::{ql_all_sqr, uql_a0, Strategy};
pub use siegel::{siegel_reduce, siegel_transform, siegel_transform_z, transform_kappa, Transform};

#[cfg(test)]
mod tests;
