use num_bigint::BigInt;
use num_traits::One;

use crate::ball::{pi, Acb, Ball};
use crate::characteristic::dot_slong;

use super::precomp::{PhaseTable, Precomp};

/// Multi-indices `α ∈ ℕ^g` with `|α| ≤ ord`, by increasing total order and
/// lexicographically decreasing within one order.
pub fn jet_orders(g: usize, ord: u32) -> Vec<Vec<u32>> {
    fn fill(g: usize, total: u32, prefix: &mut Vec<u32>, out: &mut Vec<Vec<u32>>) {
        if prefix.len() + 1 == g {
            prefix.push(total);
            out.push(prefix.clone());
            prefix.pop();
            return;
        }
        for k in (0..=total).rev() {
            prefix.push(k);
            fill(g, total - k, prefix, out);
            prefix.pop();
        }
    }
    let mut out = Vec::new();
    if g == 0 {
        out.push(Vec::new());
        return out;
    }
    for total in 0..=ord {
        fill(g, total, &mut Vec::with_capacity(g), &mut out);
    }
    out
}

fn parity(n: &[i64], b: u64) -> bool {
    dot_slong(b, n, n.len()) % 2 == 1
}

/// `Σ_n (−1)^{n·b} exp(πi nᵗτn + 2πi nᵗz)` for `b = 0` only, or for every
/// `b ∈ {0,1}^g` when `all_b` is set.
pub fn sum_0b(pre: &Precomp, phases: &PhaseTable, g: usize, all_b: bool, prec: u64) -> Vec<Acb> {
    let nb = if all_b { 1usize << g } else { 1 };
    let mut sums = vec![Acb::zero(); nb];
    for (n, f) in pre.points().iter().zip(pre.factors()) {
        let term = f.mul(&phases.phase(n, prec), prec);
        for (b, s) in sums.iter_mut().enumerate() {
            *s = if parity(n, b as u64) {
                s.sub(&term, prec)
            } else {
                s.add(&term, prec)
            };
        }
    }
    sums
}

/// Taylor coefficients `Σ_n (−1)^{n·b} term_n (2πi)^{|α|} n^α / α!` for
/// every `b` and every `α` of [`jet_orders`], `b`-major.
pub fn sum_0b_jet(
    pre: &Precomp,
    phases: &PhaseTable,
    g: usize,
    ord: u32,
    prec: u64,
) -> Vec<Acb> {
    let orders = jet_orders(g, ord);
    let two_pi = pi(prec).mul_2exp(1);
    let consts: Vec<Acb> = orders
        .iter()
        .map(|alpha| {
            let k: u32 = alpha.iter().sum();
            let fact = alpha
                .iter()
                .fold(BigInt::one(), |acc, &a| acc * (1..=a).fold(BigInt::one(), |f, i| f * i));
            Acb::from_real(two_pi.pow_ui(u64::from(k), prec))
                .mul_i_pow(i64::from(k))
                .div_real(&Ball::from_bigint(&fact), prec)
        })
        .collect();

    let nb = 1usize << g;
    let mut sums = vec![Acb::zero(); nb * orders.len()];
    for (n, f) in pre.points().iter().zip(pre.factors()) {
        let term = f.mul(&phases.phase(n, prec), prec);
        let scaled: Vec<Acb> = orders
            .iter()
            .zip(&consts)
            .map(|(alpha, c)| {
                let mono = n
                    .iter()
                    .zip(alpha)
                    .fold(BigInt::one(), |acc, (&x, &a)| acc * BigInt::from(x).pow(a));
                term.mul(c, prec).mul_real(&Ball::from_bigint(&mono), prec)
            })
            .collect();
        for b in 0..nb {
            let neg = parity(n, b as u64);
            for (k, x) in scaled.iter().enumerate() {
                let s = &mut sums[b * orders.len() + k];
                *s = if neg { s.sub(x, prec) } else { s.add(x, prec) };
            }
        }
    }
    sums
}
