//! Certified ball arithmetic: exact dyadic midpoints with upper-bound radii.

pub mod complex;
pub mod dyadic;
pub mod elementary;
pub mod mag;
pub mod real;

pub use complex::Acb;
pub use dyadic::Dyadic;
pub use elementary::{exp, exp_pi_i, pi, sin_cos_pi};
pub use mag::Mag;
pub use real::Ball;
