use rayon::prelude::*;

use crate::ball::{exp_pi_i, Acb};
use crate::ellipsoid::Ellipsoid;
use crate::matrix::AcbMat;

/// Per-point factors `exp(πi nᵗτn)`, shared by every `z`.
#[derive(Clone, Debug)]
pub struct Precomp {
    points: Vec<Vec<i64>>,
    factors: Vec<Acb>,
    bounds: Vec<i64>,
}

impl Precomp {
    pub fn new(e: &Ellipsoid, tau: &AcbMat, prec: u64, par_threshold: usize) -> Self {
        let points: Vec<Vec<i64>> = e.points().collect();
        let quad = |n: &Vec<i64>| {
            let g = n.len();
            // nᵗτn with the off-diagonal entries counted twice
            let mut s = Acb::zero();
            for i in 0..g {
                if n[i] == 0 {
                    continue;
                }
                s = s.add(&tau[(i, i)].mul_si(n[i] * n[i], prec), prec);
                for j in i + 1..g {
                    if n[j] != 0 {
                        s = s.add(&tau[(i, j)].mul_si(2 * n[i] * n[j], prec), prec);
                    }
                }
            }
            exp_pi_i(&s, prec)
        };
        let factors = if points.len() >= par_threshold.max(1) * 64 {
            points.par_iter().map(quad).collect()
        } else {
            points.iter().map(quad).collect()
        };
        let bounds = e.box_bounds();
        Self {
            points,
            factors,
            bounds,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vec<i64>] {
        &self.points
    }

    pub fn factors(&self) -> &[Acb] {
        &self.factors
    }

    pub fn bounds(&self) -> &[i64] {
        &self.bounds
    }
}

/// Powers `exp(2πi k z_j)` for `|k|` up to the box bound of coordinate `j`.
#[derive(Clone, Debug)]
pub struct PhaseTable {
    bounds: Vec<i64>,
    powers: Vec<Vec<Acb>>,
}

impl PhaseTable {
    pub fn new(z: &[Acb], bounds: &[i64], prec: u64) -> Self {
        let powers = z
            .iter()
            .zip(bounds)
            .map(|(zj, &b)| {
                let w = exp_pi_i(&zj.mul_2exp(1), prec);
                let winv = exp_pi_i(&zj.mul_2exp(1).neg(), prec);
                let b = b as usize;
                let mut row = vec![Acb::one(); 2 * b + 1];
                for k in 1..=b {
                    row[b + k] = row[b + k - 1].mul(&w, prec);
                    row[b - k] = row[b - k + 1].mul(&winv, prec);
                }
                row
            })
            .collect();
        Self {
            bounds: bounds.to_vec(),
            powers,
        }
    }

    /// `exp(2πi nᵗz)`.
    pub fn phase(&self, n: &[i64], prec: u64) -> Acb {
        n.iter()
            .enumerate()
            .filter(|(_, &k)| k != 0)
            .fold(Acb::one(), |acc, (j, &k)| {
                acc.mul(&self.powers[j][(self.bounds[j] + k) as usize], prec)
            })
    }
}
