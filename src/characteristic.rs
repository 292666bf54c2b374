//! Theta characteristics.
//!
//! A characteristic `(a, b)` with `a, b ∈ {0,1}^g` is packed into one word:
//! `a` occupies the high `g` bits and `b` the low `g` bits, and inside each
//! half coordinate `0` is the most significant bit. The theta function with
//! characteristic `(a, b)` is
//!
//! `θ_{a,b}(z, τ) = Σ_n exp(πi (n + a/2)ᵗ τ (n + a/2) + 2πi (n + a/2)ᵗ (z + b/2))`.

use crate::ball::{Acb, Ball};

/// Packed characteristic `(a << g) | b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Char(pub u64);

impl Char {
    pub fn new(a: u64, b: u64, g: usize) -> Self {
        Char((a << g) | b)
    }

    pub fn a(self, g: usize) -> u64 {
        self.0 >> g
    }

    pub fn b(self, g: usize) -> u64 {
        self.0 & ((1u64 << g) - 1)
    }

    /// Even characteristics are those with `a·b ≡ 0 (mod 2)`.
    pub fn is_even(self, g: usize) -> bool {
        dot(self.a(g), self.b(g), g) % 2 == 0
    }

    /// All `4^g` characteristics in index order.
    pub fn all(g: usize) -> impl Iterator<Item = Char> {
        (0..1u64 << (2 * g)).map(Char)
    }
}

/// Bit `j` (coordinate order) of a `g`-bit vector.
pub fn bit(a: u64, j: usize, g: usize) -> u64 {
    (a >> (g - 1 - j)) & 1
}

/// Parities of an integer vector, packed as a `g`-bit vector.
pub fn get_a(n: &[i64]) -> u64 {
    n.iter()
        .fold(0u64, |acc, &x| (acc << 1) | (x.rem_euclid(2) as u64))
}

pub fn get_slong(a: u64, g: usize) -> Vec<i64> {
    (0..g).map(|j| bit(a, j, g) as i64).collect()
}

/// Entries `a_j / 2` as exact complex balls.
pub fn get_acb(a: u64, g: usize) -> Vec<Acb> {
    (0..g)
        .map(|j| Acb::from_real(Ball::from_int(bit(a, j, g) as i64).mul_2exp(-1)))
        .collect()
}

/// `Σ a_j b_j mod 4`.
pub fn dot(a: u64, b: u64, g: usize) -> i64 {
    let mask = if g == 64 { u64::MAX } else { (1u64 << g) - 1 };
    ((a & b & mask).count_ones() % 4) as i64
}

/// `Σ a_j n_j mod 4`.
pub fn dot_slong(a: u64, n: &[i64], g: usize) -> i64 {
    (0..g)
        .map(|j| bit(a, j, g) as i64 * n[j])
        .sum::<i64>()
        .rem_euclid(4)
}

/// `Σ (a_j / 2) v_j`.
pub fn dot_acb(a: u64, v: &[Acb], g: usize, prec: u64) -> Acb {
    (0..g)
        .filter(|&j| bit(a, j, g) == 1)
        .fold(Acb::zero(), |acc, j| acc.add(&v[j], prec))
        .mul_2exp(-1)
}
