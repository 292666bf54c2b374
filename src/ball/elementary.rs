//! Elementary functions on balls: `pi`, `exp`, and `sin`/`cos` of `pi x`.

use std::cell::RefCell;
use std::collections::HashMap;

use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};

use super::complex::Acb;
use super::dyadic::Dyadic;
use super::mag::Mag;
use super::real::Ball;

thread_local! {
    static PI_CACHE: RefCell<HashMap<u64, Ball>> = RefCell::new(HashMap::new());
}

/// `2^w * atan(1/x)` by its Taylor series in fixed point, with the number of
/// terms used. Each term is off by less than two units.
fn atan_inv_fixed(x: u64, w: u64) -> (BigInt, u64) {
    let x2 = x * x;
    let mut power = (BigInt::one() << (w as usize)) / x;
    let mut sum = power.clone();
    let mut k = 1u64;
    loop {
        power /= x2;
        if power.is_zero() {
            break;
        }
        let term = &power / (2 * k + 1);
        if k % 2 == 1 {
            sum -= term;
        } else {
            sum += term;
        }
        k += 1;
    }
    (sum, k)
}

fn pi_uncached(prec: u64) -> Ball {
    let w = prec + 64;
    // Machin: pi = 16 atan(1/5) - 4 atan(1/239)
    let (a, na) = atan_inv_fixed(5, w);
    let (b, nb) = atan_inv_fixed(239, w);
    let sum = a * 16u32 - b * 4u32;
    let units = 16 * (2 * na + 2) + 4 * (2 * nb + 2);
    let rad = Mag::from_u64(units).mul_2exp(-(w as i64));
    Ball::new(Dyadic::new(sum, -(w as i64)), rad).round(prec)
}

/// `pi` to `prec` bits, cached per thread.
pub fn pi(prec: u64) -> Ball {
    PI_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .entry(prec)
            .or_insert_with(|| pi_uncached(prec))
            .clone()
    })
}

const LOG2_E: f64 = std::f64::consts::LOG2_E;

/// `exp(x)` at an exact point.
fn exp_point(m: &Dyadic, prec: u64) -> Ball {
    if m.is_zero() {
        return Ball::one();
    }
    // halve the argument until |t| < 2^-12, then square back
    let s = (m.top() + 12).max(0) as u64;
    let wp = prec + s + 32;
    let t = Ball::from_dyadic(m.mul_2exp(-(s as i64)));
    let n = wp / 12 + 2;
    let mut sum = Ball::one();
    let mut term = Ball::one();
    for k in 1..n {
        term = term.mul(&t, wp).div_si(k as i64, wp);
        sum = sum.add(&term, wp);
    }
    // sum_{k >= n} |t|^k / k! <= 2 |t|^n
    sum.add_error(&Mag::pow2(1 - 12 * n as i64));
    for _ in 0..s {
        sum = sum.sqr(wp);
    }
    sum.round(prec)
}

/// Certified exponential of a real ball.
pub fn exp(x: &Ball, prec: u64) -> Ball {
    let (lo, hi) = match (x.lower(), x.upper()) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => return Ball::indeterminate(),
    };
    if hi.is_negative() && hi.top() > 25 {
        // below 2^-(2^24 log2 e): only an upper bound is useful
        let e = (hi.to_f64() * LOG2_E).ceil();
        let e = if e.is_finite() { e as i64 } else { i64::MIN / 4 };
        return Ball::new(Dyadic::zero(), Mag::pow2(e.saturating_add(1)));
    }
    if hi.is_positive() && hi.top() > 25 {
        return Ball::indeterminate();
    }
    if x.is_exact() {
        return exp_point(x.mid(), prec);
    }
    if *x.rad() > Mag::pow2(-8) {
        // monotone, so the image of the ball is the hull of the endpoint images
        let a = exp(&Ball::from_dyadic(lo), prec);
        let b = exp(&Ball::from_dyadic(hi), prec);
        return a.union(&b, prec);
    }
    // exp(m + e) - exp(m) <= exp(m) (e^r - 1) <= 2 r exp(m) for r <= 1/256
    let e = exp_point(x.mid(), prec);
    let err = e.mag_upper().mul(&x.rad().mul_2exp(1));
    e.with_error(&err)
}

/// `sin(y)` and `cos(y)` for `|y| < 1` by Taylor series.
fn sin_cos_taylor(y: &Ball, wp: u64) -> (Ball, Ball) {
    // terms until (2N)! > 2^(wp + 1)
    let mut j = 0u64;
    let mut log_fact = 0.0f64;
    while log_fact < wp as f64 + 2.0 {
        j += 1;
        log_fact += (j as f64).log2();
    }
    let n = j + (j & 1);
    let mut sin = Ball::zero();
    let mut cos = Ball::zero();
    let mut term = Ball::one();
    for k in 0..n {
        if k > 0 {
            term = term.mul(y, wp).div_si(k as i64, wp);
        }
        let signed = if (k / 2) % 2 == 1 { term.neg() } else { term.clone() };
        if k % 2 == 0 {
            cos = cos.add(&signed, wp);
        } else {
            sin = sin.add(&signed, wp);
        }
    }
    let tail = Mag::pow2(-(wp as i64));
    (sin.with_error(&tail), cos.with_error(&tail))
}

/// `(sin(pi x), cos(pi x))`.
pub fn sin_cos_pi(x: &Ball, prec: u64) -> (Ball, Ball) {
    if !x.is_finite() || *x.rad() > Mag::one() {
        let unit = Ball::new(Dyadic::zero(), Mag::one());
        return (unit.clone(), unit);
    }
    let m = x.mid();
    // x = q/2 + t with |t| <= 1/4
    let q = m.mul_2exp(1).round_nearest();
    let t = m.sub(&Dyadic::from_bigint(q.clone()).mul_2exp(-1));
    let quadrant = (q % BigInt::from(4)).to_i64().unwrap_or(0).rem_euclid(4);
    let wp = prec + 32;
    let y = pi(wp).mul(&Ball::from_dyadic(t), wp);
    let (s, c) = sin_cos_taylor(&y, wp);
    let (s, c) = match quadrant {
        0 => (s, c),
        1 => (c, s.neg()),
        2 => (s.neg(), c.neg()),
        _ => (c.neg(), s),
    };
    // both are 4-Lipschitz in x
    let err = x.rad().mul_2exp(2);
    (s.with_error(&err).round(prec), c.with_error(&err).round(prec))
}

/// `exp(pi i z)`.
pub fn exp_pi_i(z: &Acb, prec: u64) -> Acb {
    let wp = prec + 16;
    let modulus = exp(&z.im().mul(&pi(wp), wp).neg(), wp);
    let (s, c) = sin_cos_pi(z.re(), wp);
    Acb::new(c.mul(&modulus, prec), s.mul(&modulus, prec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PREC: u64 = 200;

    #[test]
    fn test_pi_digits() {
        let p = pi(PREC);
        assert!(p.rel_accuracy_bits() > 190);
        assert!((p.to_f64() - std::f64::consts::PI).abs() < 1e-15);
    }

    #[test]
    fn test_exp_known_values() {
        let e = exp(&Ball::one(), PREC);
        assert!((e.to_f64() - std::f64::consts::E).abs() < 1e-15);
        assert!(e.rel_accuracy_bits() > 180);
        let tiny = exp(&Ball::from_int(-100_000_000), PREC);
        assert!(tiny.contains_zero());
        assert!(tiny.is_finite());
        assert!(!exp(&Ball::from_int(100_000_000), PREC).is_finite());
    }

    #[test]
    fn test_exp_pi_i_half_turn() {
        let z = exp_pi_i(&Acb::one(), PREC);
        assert!(z.contains(&Acb::from_int(-1)));
        let w = exp_pi_i(&Acb::from_f64(0.5, 0.0), PREC);
        assert!(w.contains(&Acb::i()));
    }

    proptest! {
        #[test]
        fn test_exp_matches_f64(x in -40.0f64..40.0) {
            let e = exp(&Ball::from_f64(x), 100);
            let expected = x.exp();
            prop_assert!((e.to_f64() - expected).abs() <= expected * 1e-14);
            prop_assert!(e.rel_accuracy_bits() > 90);
        }

        #[test]
        fn test_exp_of_wide_ball_encloses(x in -10.0f64..10.0, r in 0.0f64..2.0) {
            let b = Ball::new(Dyadic::from_f64(x).unwrap(), Mag::from_f64(r));
            let e = exp(&b, 64);
            prop_assert!(e.overlaps(&exp(&Ball::from_f64(x + r * 0.99), 64)));
            prop_assert!(e.overlaps(&exp(&Ball::from_f64(x - r * 0.99), 64)));
        }

        #[test]
        fn test_pythagoras(x in -100.0f64..100.0) {
            let (s, c) = sin_cos_pi(&Ball::from_f64(x), PREC);
            let one = s.sqr(PREC).add(&c.sqr(PREC), PREC);
            prop_assert!(one.contains(&Ball::one()));
            prop_assert!((s.to_f64() - (std::f64::consts::PI * x).sin()).abs() < 1e-12);
        }
    }
}
