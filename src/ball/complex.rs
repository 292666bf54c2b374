use std::fmt;

use super::mag::Mag;
use super::real::Ball;

/// Complex ball in rectangular form.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Acb {
    re: Ball,
    im: Ball,
}

impl Acb {
    pub fn new(re: Ball, im: Ball) -> Self {
        Self { re, im }
    }

    pub fn zero() -> Self {
        Self::new(Ball::zero(), Ball::zero())
    }

    pub fn one() -> Self {
        Self::from_real(Ball::one())
    }

    pub fn i() -> Self {
        Self::new(Ball::zero(), Ball::one())
    }

    pub fn from_real(re: Ball) -> Self {
        Self::new(re, Ball::zero())
    }

    pub fn from_int(n: i64) -> Self {
        Self::from_real(Ball::from_int(n))
    }

    pub fn from_f64(re: f64, im: f64) -> Self {
        Self::new(Ball::from_f64(re), Ball::from_f64(im))
    }

    pub fn indeterminate() -> Self {
        Self::new(Ball::indeterminate(), Ball::indeterminate())
    }

    pub fn re(&self) -> &Ball {
        &self.re
    }

    pub fn im(&self) -> &Ball {
        &self.im
    }

    pub fn is_finite(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    pub fn is_real(&self) -> bool {
        self.im.is_exact() && self.im.mid().is_zero()
    }

    pub fn round(&self, prec: u64) -> Acb {
        Self::new(self.re.round(prec), self.im.round(prec))
    }

    /// Widens both parts by `err`.
    pub fn add_error(&mut self, err: &Mag) {
        self.re.add_error(err);
        self.im.add_error(err);
    }

    pub fn neg(&self) -> Acb {
        Self::new(self.re.neg(), self.im.neg())
    }

    pub fn conj(&self) -> Acb {
        Self::new(self.re.clone(), self.im.neg())
    }

    pub fn mul_2exp(&self, e: i64) -> Acb {
        Self::new(self.re.mul_2exp(e), self.im.mul_2exp(e))
    }

    pub fn add(&self, other: &Acb, prec: u64) -> Acb {
        Self::new(self.re.add(&other.re, prec), self.im.add(&other.im, prec))
    }

    pub fn sub(&self, other: &Acb, prec: u64) -> Acb {
        Self::new(self.re.sub(&other.re, prec), self.im.sub(&other.im, prec))
    }

    pub fn mul(&self, other: &Acb, prec: u64) -> Acb {
        if other.is_real() {
            return self.mul_real(&other.re, prec);
        }
        if self.is_real() {
            return other.mul_real(&self.re, prec);
        }
        let ac = self.re.mul(&other.re, prec);
        let bd = self.im.mul(&other.im, prec);
        let ad = self.re.mul(&other.im, prec);
        let bc = self.im.mul(&other.re, prec);
        Self::new(ac.sub(&bd, prec), ad.add(&bc, prec))
    }

    pub fn sqr(&self, prec: u64) -> Acb {
        self.mul(self, prec)
    }

    pub fn mul_real(&self, x: &Ball, prec: u64) -> Acb {
        Self::new(self.re.mul(x, prec), self.im.mul(x, prec))
    }

    pub fn mul_si(&self, n: i64, prec: u64) -> Acb {
        self.mul_real(&Ball::from_int(n), prec)
    }

    /// Multiplication by `i`.
    pub fn mul_onei(&self) -> Acb {
        Self::new(self.im.neg(), self.re.clone())
    }

    /// Multiplication by `i^k`.
    pub fn mul_i_pow(&self, k: i64) -> Acb {
        match k.rem_euclid(4) {
            0 => self.clone(),
            1 => self.mul_onei(),
            2 => self.neg(),
            _ => self.mul_onei().neg(),
        }
    }

    /// `|z|^2` as a real ball.
    pub fn norm_sqr(&self, prec: u64) -> Ball {
        self.re.sqr(prec).add(&self.im.sqr(prec), prec)
    }

    pub fn abs(&self, prec: u64) -> Ball {
        self.norm_sqr(prec).sqrt(prec)
    }

    pub fn div_real(&self, x: &Ball, prec: u64) -> Acb {
        Self::new(self.re.div(x, prec), self.im.div(x, prec))
    }

    pub fn div_si(&self, n: i64, prec: u64) -> Acb {
        self.div_real(&Ball::from_int(n), prec)
    }

    pub fn div(&self, other: &Acb, prec: u64) -> Acb {
        if other.is_real() {
            return self.div_real(&other.re, prec);
        }
        let den = other.norm_sqr(prec);
        if den.contains_zero() {
            return Self::indeterminate();
        }
        self.mul(&other.conj(), prec).div_real(&den, prec)
    }

    pub fn inv(&self, prec: u64) -> Acb {
        Acb::one().div(self, prec)
    }

    pub fn pow_ui(&self, n: u64, prec: u64) -> Acb {
        let mut result = Acb::one();
        let mut base = self.clone();
        let mut k = n;
        while k > 0 {
            if k & 1 == 1 {
                result = result.mul(&base, prec);
            }
            k >>= 1;
            if k > 0 {
                base = base.sqr(prec);
            }
        }
        result
    }

    pub fn pow_si(&self, n: i64, prec: u64) -> Acb {
        if n >= 0 {
            self.pow_ui(n as u64, prec)
        } else {
            self.inv(prec).pow_ui(n.unsigned_abs(), prec)
        }
    }

    /// Principal square root. Indeterminate when the ball may touch the
    /// branch cut along the negative real axis.
    pub fn sqrt(&self, prec: u64) -> Acb {
        let wp = prec + 10;
        if self.re.is_positive() {
            let r = self.abs(wp);
            let t = r.add(&self.re, wp).mul_2exp(-1).sqrt(wp);
            let im = self.im.div(&t.mul_2exp(1), wp);
            return Self::new(t, im).round(prec);
        }
        let upper = self.im.is_positive();
        if upper || self.im.is_negative() {
            let r = self.abs(wp);
            let u = r.sub(&self.re, wp).mul_2exp(-1).sqrt(wp);
            let re = self.im.div(&u.mul_2exp(1), wp);
            let im = if upper { u } else { u.neg() };
            // re = y / (2u) carries the sign of y, so flip it back for y < 0
            let re = if upper { re } else { re.neg() };
            return Self::new(re, im).round(prec);
        }
        if self.re.is_exact() && self.im.is_exact() && self.re.mid().is_zero() && self.im.mid().is_zero() {
            return Acb::zero();
        }
        Self::indeterminate()
    }

    pub fn contains_zero(&self) -> bool {
        self.re.contains_zero() && self.im.contains_zero()
    }

    pub fn overlaps(&self, other: &Acb) -> bool {
        self.re.overlaps(&other.re) && self.im.overlaps(&other.im)
    }

    pub fn contains(&self, other: &Acb) -> bool {
        self.re.contains(&other.re) && self.im.contains(&other.im)
    }

    pub fn union(&self, other: &Acb, prec: u64) -> Acb {
        Self::new(self.re.union(&other.re, prec), self.im.union(&other.im, prec))
    }

    /// Upper bound of `|z|`.
    pub fn mag_upper(&self) -> Mag {
        let re = self.re.mag_upper();
        let im = self.im.mag_upper();
        re.mul(&re).add(&im.mul(&im)).sqrt()
    }

    /// Lower bound of `|z|`.
    pub fn mag_lower(&self) -> Mag {
        let re = self.re.mag_lower();
        let im = self.im.mag_lower();
        re.mul_lower(&re).max(im.mul_lower(&im)).sqrt_lower()
    }

    /// Bits of relative accuracy of the worse part.
    pub fn rel_accuracy_bits(&self) -> i64 {
        let m = self.mag_upper().log2_ceil();
        let r = (*self.re.rad()).max(*self.im.rad());
        if r.is_zero() {
            return i64::MAX;
        }
        m - r.log2_ceil()
    }

    pub fn to_c64(&self) -> (f64, f64) {
        (self.re.to_f64(), self.im.to_f64())
    }
}

impl fmt::Display for Acb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}*I", self.re, self.im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PREC: u64 = 128;

    #[test]
    fn test_i_squared() {
        let m = Acb::i().sqr(PREC);
        assert!(m.contains(&Acb::from_int(-1)));
        assert!(Acb::i().mul_i_pow(3).contains(&Acb::one()));
    }

    #[test]
    fn test_sqrt_branches() {
        let s = Acb::from_f64(-4.0, 0.0).sqrt(PREC);
        assert!(!s.is_finite());
        let s = Acb::from_f64(-4.0, 1e-3).sqrt(PREC);
        assert!(s.im().is_positive());
        let s = Acb::from_f64(-4.0, -1e-3).sqrt(PREC);
        assert!(s.im().is_negative());
        assert!(s.re().is_positive());
    }

    proptest! {
        #[test]
        fn test_sqrt_squares_back(x in -10.0f64..10.0, y in -10.0f64..10.0) {
            let z = Acb::from_f64(x, y);
            let s = z.sqrt(PREC);
            prop_assume!(s.is_finite());
            prop_assert!(s.sqr(PREC).overlaps(&z));
            prop_assert!(!s.re().is_negative());
        }

        #[test]
        fn test_division_inverts_multiplication(
            a in -5.0f64..5.0, b in -5.0f64..5.0, c in 0.5f64..5.0, d in -5.0f64..5.0,
        ) {
            let z = Acb::from_f64(a, b);
            let w = Acb::from_f64(c, d);
            prop_assert!(z.mul(&w, PREC).div(&w, PREC).overlaps(&z));
        }
    }
}
