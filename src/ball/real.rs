use std::fmt;

use num_bigint::BigInt;

use super::dyadic::Dyadic;
use super::mag::Mag;

/// Real ball `[mid - rad, mid + rad]`.
///
/// Every operation returns a ball containing the exact result for every pair
/// of representatives of its inputs. The working precision is passed to each
/// operation and bounds the midpoint's mantissa length; rounding errors are
/// folded into the radius.
#[derive(Clone, Debug, PartialEq)]
pub struct Ball {
    mid: Dyadic,
    rad: Mag,
}

impl Ball {
    pub fn new(mid: Dyadic, rad: Mag) -> Self {
        Self { mid, rad }
    }

    pub fn zero() -> Self {
        Self::new(Dyadic::zero(), Mag::zero())
    }

    pub fn one() -> Self {
        Self::from_int(1)
    }

    pub fn from_int(n: i64) -> Self {
        Self::new(Dyadic::from_int(n), Mag::zero())
    }

    pub fn from_bigint(n: &BigInt) -> Self {
        Self::new(Dyadic::from_bigint(n.clone()), Mag::zero())
    }

    pub fn from_dyadic(d: Dyadic) -> Self {
        Self::new(d, Mag::zero())
    }

    /// Exact ball around `x`; indeterminate for non-finite input.
    pub fn from_f64(x: f64) -> Self {
        match Dyadic::from_f64(x) {
            Some(d) => Self::from_dyadic(d),
            None => Self::indeterminate(),
        }
    }

    /// Ball `[lo, hi]` with the midpoint rounded to `prec` bits.
    pub fn from_interval(lo: &Dyadic, hi: &Dyadic, prec: u64) -> Self {
        let mid = lo.add(hi).mul_2exp(-1);
        let rad = hi.sub(lo).mul_2exp(-1).mag_upper();
        Self::new(mid, rad).round(prec)
    }

    /// The whole real line.
    pub fn indeterminate() -> Self {
        Self::new(Dyadic::zero(), Mag::inf())
    }

    pub fn mid(&self) -> &Dyadic {
        &self.mid
    }

    pub fn rad(&self) -> &Mag {
        &self.rad
    }

    pub fn is_finite(&self) -> bool {
        !self.rad.is_inf()
    }

    pub fn is_exact(&self) -> bool {
        self.rad.is_zero()
    }

    pub fn lower(&self) -> Option<Dyadic> {
        self.is_finite()
            .then(|| self.mid.sub(&Dyadic::from_mag(&self.rad)))
    }

    pub fn upper(&self) -> Option<Dyadic> {
        self.is_finite()
            .then(|| self.mid.add(&Dyadic::from_mag(&self.rad)))
    }

    pub fn round(&self, prec: u64) -> Ball {
        let (mid, err) = self.mid.round(prec);
        Self::new(mid, self.rad.add(&err))
    }

    pub fn add_error(&mut self, err: &Mag) {
        self.rad = self.rad.add(err);
    }

    pub fn with_error(mut self, err: &Mag) -> Ball {
        self.add_error(err);
        self
    }

    pub fn neg(&self) -> Ball {
        Self::new(self.mid.neg(), self.rad)
    }

    pub fn mul_2exp(&self, e: i64) -> Ball {
        Self::new(self.mid.mul_2exp(e), self.rad.mul_2exp(e))
    }

    pub fn add(&self, other: &Ball, prec: u64) -> Ball {
        if !self.is_finite() || !other.is_finite() {
            return Self::indeterminate();
        }
        let limit = prec as i64 + 64;
        if !self.mid.is_zero() && !other.mid.is_zero() {
            // Far-apart magnitudes: the small term only widens the radius.
            let (ta, tb) = (self.mid.top(), other.mid.top());
            if ta - tb > limit {
                let rad = self.rad.add(&other.rad).add(&other.mid.mag_upper());
                return Self::new(self.mid.clone(), rad).round(prec);
            }
            if tb - ta > limit {
                let rad = self.rad.add(&other.rad).add(&self.mid.mag_upper());
                return Self::new(other.mid.clone(), rad).round(prec);
            }
        }
        Self::new(self.mid.add(&other.mid), self.rad.add(&other.rad)).round(prec)
    }

    pub fn sub(&self, other: &Ball, prec: u64) -> Ball {
        self.add(&other.neg(), prec)
    }

    pub fn mul(&self, other: &Ball, prec: u64) -> Ball {
        if !self.is_finite() || !other.is_finite() {
            return Self::indeterminate();
        }
        let rad = self
            .mid
            .mag_upper()
            .mul(&other.rad)
            .add(&other.mid.mag_upper().mul(&self.rad))
            .add(&self.rad.mul(&other.rad));
        Self::new(self.mid.mul(&other.mid), rad).round(prec)
    }

    pub fn sqr(&self, prec: u64) -> Ball {
        self.mul(self, prec)
    }

    pub fn mul_si(&self, n: i64, prec: u64) -> Ball {
        self.mul(&Ball::from_int(n), prec)
    }

    pub fn div(&self, other: &Ball, prec: u64) -> Ball {
        if !self.is_finite() || other.contains_zero() {
            return Self::indeterminate();
        }
        let (q, qerr) = self.mid.div_round(&other.mid, prec);
        let mut rad = qerr;
        if !self.rad.is_zero() || !other.rad.is_zero() {
            let num = self
                .mid
                .mag_upper()
                .mul(&other.rad)
                .add(&other.mid.mag_upper().mul(&self.rad));
            let den = other.mid.mag_lower().mul_lower(&other.mag_lower());
            rad = rad.add(&num.div(&den));
        }
        Self::new(q, rad).round(prec)
    }

    pub fn div_si(&self, n: i64, prec: u64) -> Ball {
        self.div(&Ball::from_int(n), prec)
    }

    pub fn inv(&self, prec: u64) -> Ball {
        Ball::one().div(self, prec)
    }

    pub fn sqrt(&self, prec: u64) -> Ball {
        let (lo, hi) = match (self.lower(), self.upper()) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return Self::indeterminate(),
        };
        if hi.is_negative() {
            return Self::indeterminate();
        }
        if !lo.is_positive() {
            // [0, sqrt(hi)]
            let s = hi.mag_upper().sqrt();
            let half = s.mul_2exp(-1);
            return Self::new(Dyadic::from_mag(&half), half).round(prec);
        }
        let (r, rerr) = self.mid.sqrt_round(prec);
        let mut rad = rerr;
        if !self.rad.is_zero() {
            let den = lo.mag_lower().sqrt_lower().mul_2exp(1);
            rad = rad.add(&self.rad.div(&den));
        }
        Self::new(r, rad).round(prec)
    }

    pub fn pow_ui(&self, n: u64, prec: u64) -> Ball {
        let mut result = Ball::one();
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

    /// Upper bound of `|x|` over the ball.
    pub fn mag_upper(&self) -> Mag {
        self.mid.mag_upper().add(&self.rad)
    }

    /// Lower bound of `|x|` over the ball.
    pub fn mag_lower(&self) -> Mag {
        self.mid.mag_lower().sub_lower(&self.rad)
    }

    pub fn contains_zero(&self) -> bool {
        !self.is_finite() || self.mid.abs() <= Dyadic::from_mag(&self.rad)
    }

    pub fn is_positive(&self) -> bool {
        self.is_finite() && self.mid.is_positive() && self.mid > Dyadic::from_mag(&self.rad)
    }

    pub fn is_negative(&self) -> bool {
        self.neg().is_positive()
    }

    pub fn is_nonnegative(&self) -> bool {
        self.lower().map_or(false, |lo| !lo.is_negative())
    }

    pub fn is_nonpositive(&self) -> bool {
        self.upper().map_or(false, |hi| !hi.is_positive())
    }

    /// Certainly greater than `other`.
    pub fn gt(&self, other: &Ball) -> bool {
        match (self.lower(), other.upper()) {
            (Some(lo), Some(hi)) => lo > hi,
            _ => false,
        }
    }

    /// Certainly smaller than `other`.
    pub fn lt(&self, other: &Ball) -> bool {
        other.gt(self)
    }

    pub fn overlaps(&self, other: &Ball) -> bool {
        if !self.is_finite() || !other.is_finite() {
            return true;
        }
        let dist = self.mid.sub(&other.mid).abs();
        dist <= Dyadic::from_mag(&self.rad).add(&Dyadic::from_mag(&other.rad))
    }

    /// Whether `other` lies inside `self`.
    pub fn contains(&self, other: &Ball) -> bool {
        if !self.is_finite() {
            return true;
        }
        if !other.is_finite() {
            return false;
        }
        let dist = self.mid.sub(&other.mid).abs();
        dist.add(&Dyadic::from_mag(&other.rad)) <= Dyadic::from_mag(&self.rad)
    }

    pub fn contains_int(&self, n: &BigInt) -> bool {
        self.contains(&Ball::from_bigint(n))
    }

    /// The only integer inside the ball, if there is exactly one.
    pub fn unique_int(&self) -> Option<BigInt> {
        let lo = self.lower()?.ceil();
        let hi = self.upper()?.floor();
        (lo == hi).then_some(lo)
    }

    /// Convex hull of both balls.
    pub fn union(&self, other: &Ball, prec: u64) -> Ball {
        match (self.lower(), self.upper(), other.lower(), other.upper()) {
            (Some(la), Some(ha), Some(lb), Some(hb)) => {
                let lo = if la <= lb { la } else { lb };
                let hi = if ha >= hb { ha } else { hb };
                Self::from_interval(&lo, &hi, prec)
            }
            _ => Self::indeterminate(),
        }
    }

    /// Bits of relative accuracy, `i64::MAX` for exact balls.
    pub fn rel_accuracy_bits(&self) -> i64 {
        if self.rad.is_zero() {
            return i64::MAX;
        }
        if self.mid.is_zero() || !self.is_finite() {
            return i64::MIN / 4;
        }
        self.mid.top() - 1 - self.rad.log2_ceil()
    }

    pub fn to_f64(&self) -> f64 {
        self.mid.to_f64()
    }
}

impl Default for Ball {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Ball {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} +/- {}]", self.mid, self.rad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PREC: u64 = 128;

    fn ball(x: f64, r: f64) -> Ball {
        Ball::new(Dyadic::from_f64(x).unwrap(), Mag::from_f64(r))
    }

    #[test]
    fn test_division_by_zero_is_indeterminate() {
        let q = Ball::one().div(&ball(0.0, 0.1), PREC);
        assert!(!q.is_finite());
        assert!(q.contains_zero());
    }

    #[test]
    fn test_sqrt_of_straddling_ball() {
        let s = ball(0.0, 4.0).sqrt(PREC);
        assert!(s.contains(&Ball::from_int(2)));
        assert!(s.contains(&Ball::zero()));
        assert!(!ball(-3.0, 1.0).sqrt(PREC).is_finite());
    }

    #[test]
    fn test_unique_int() {
        assert_eq!(ball(2.9, 0.2).unique_int(), Some(BigInt::from(3)));
        assert_eq!(ball(2.5, 0.6).unique_int(), None);
        assert_eq!(ball(-7.2, 0.1).unique_int(), None);
    }

    #[test]
    fn test_far_apart_addition_widens_radius() {
        let big = Ball::one();
        let tiny = Ball::from_dyadic(Dyadic::new(BigInt::from(1), -10_000));
        let s = big.add(&tiny, 64);
        assert!(s.contains(&Ball::one()));
        assert!(s.rad() <= &Mag::pow2(-9_990));
    }

    proptest! {
        #[test]
        fn test_field_operations_enclose(
            a in -1e6f64..1e6, b in -1e6f64..1e6,
            ra in 0.0f64..1e-3, rb in 0.0f64..1e-3,
            ta in -1.0f64..1.0, tb in -1.0f64..1.0,
        ) {
            let x = ball(a, ra);
            let y = ball(b, rb);
            // a representative of each ball
            let px = Ball::from_f64(a).add(&Ball::from_f64(ra * ta * 0.999), 200);
            let py = Ball::from_f64(b).add(&Ball::from_f64(rb * tb * 0.999), 200);
            prop_assert!(x.add(&y, 53).overlaps(&px.add(&py, 400)));
            prop_assert!(x.mul(&y, 53).contains(&px.mul(&py, 400)));
            prop_assert!(x.sub(&y, 53).contains(&px.sub(&py, 400)));
            if !y.contains_zero() {
                let exact = px.div(&py, 400);
                prop_assert!(x.div(&y, 53).overlaps(&exact));
            }
        }

        #[test]
        fn test_sqrt_squares_back(a in 1e-6f64..1e6) {
            let s = Ball::from_f64(a).sqrt(PREC);
            prop_assert!(s.sqr(PREC).contains(&Ball::from_f64(a)));
        }
    }
}
