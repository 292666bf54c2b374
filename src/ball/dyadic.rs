use std::cmp::Ordering;
use std::fmt;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::mag::{decompose_f64, pow2_f64, Mag};

/// Exact binary fraction `man * 2^exp`.
///
/// Kept normalized: the mantissa is odd, or zero with `exp == 0`. Equal
/// values therefore have equal representations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dyadic {
    man: BigInt,
    exp: i64,
}

impl Dyadic {
    pub fn new(man: BigInt, exp: i64) -> Self {
        if man.is_zero() {
            return Self::zero();
        }
        let tz = man.magnitude().trailing_zeros().unwrap_or(0);
        if tz > 0 {
            Self {
                man: man >> (tz as usize),
                exp: exp + tz as i64,
            }
        } else {
            Self { man, exp }
        }
    }

    pub fn zero() -> Self {
        Self {
            man: BigInt::zero(),
            exp: 0,
        }
    }

    pub fn one() -> Self {
        Self::from_int(1)
    }

    pub fn from_int(n: i64) -> Self {
        Self::new(BigInt::from(n), 0)
    }

    pub fn from_bigint(n: BigInt) -> Self {
        Self::new(n, 0)
    }

    /// Exact conversion; `None` for NaN and infinities.
    pub fn from_f64(x: f64) -> Option<Self> {
        if !x.is_finite() {
            return None;
        }
        if x == 0.0 {
            return Some(Self::zero());
        }
        let (m, e) = decompose_f64(x);
        let man = BigInt::from(m);
        Some(Self::new(if x < 0.0 { -man } else { man }, e))
    }

    /// Exact value of a finite radius.
    pub fn from_mag(m: &Mag) -> Self {
        Self::new(BigInt::from(m.man()), m.exp())
    }

    pub fn man(&self) -> &BigInt {
        &self.man
    }

    pub fn exp(&self) -> i64 {
        self.exp
    }

    pub fn is_zero(&self) -> bool {
        self.man.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.man.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.man.is_positive()
    }

    pub fn signum(&self) -> i32 {
        match self.man.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    pub fn bits(&self) -> u64 {
        self.man.bits()
    }

    /// `t` with `2^(t-1) <= |x| < 2^t`.
    pub fn top(&self) -> i64 {
        if self.is_zero() {
            i64::MIN / 4
        } else {
            self.exp + self.bits() as i64
        }
    }

    pub fn neg(&self) -> Self {
        Self {
            man: -&self.man,
            exp: self.exp,
        }
    }

    pub fn abs(&self) -> Self {
        Self {
            man: self.man.abs(),
            exp: self.exp,
        }
    }

    pub fn mul_2exp(&self, e: i64) -> Self {
        if self.is_zero() {
            return Self::zero();
        }
        Self {
            man: self.man.clone(),
            exp: self.exp + e,
        }
    }

    pub fn add(&self, other: &Dyadic) -> Dyadic {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let (lo, hi) = if self.exp <= other.exp {
            (self, other)
        } else {
            (other, self)
        };
        let shift = (hi.exp - lo.exp) as usize;
        Self::new(&lo.man + (&hi.man << shift), lo.exp)
    }

    pub fn sub(&self, other: &Dyadic) -> Dyadic {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Dyadic) -> Dyadic {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        // odd times odd stays odd
        Self {
            man: &self.man * &other.man,
            exp: self.exp + other.exp,
        }
    }

    /// Truncates to `prec` mantissa bits, returning the value and a bound on
    /// the discarded part.
    pub fn round(&self, prec: u64) -> (Dyadic, Mag) {
        let bits = self.bits();
        if bits <= prec {
            return (self.clone(), Mag::zero());
        }
        let shift = bits - prec;
        let kept = BigInt::from_biguint(self.man.sign(), self.man.magnitude() >> (shift as usize));
        let exp = self.exp + shift as i64;
        (Self::new(kept, exp), Mag::pow2(exp))
    }

    /// Quotient truncated to roughly `prec` bits, with its error bound.
    /// The divisor must be non-zero.
    pub fn div_round(&self, other: &Dyadic, prec: u64) -> (Dyadic, Mag) {
        if self.is_zero() {
            return (Self::zero(), Mag::zero());
        }
        let s = (prec as i64 + other.bits() as i64 - self.bits() as i64 + 2).max(0);
        let num: BigUint = self.man.magnitude() << (s as usize);
        let q = num / other.man.magnitude();
        let sign = if self.man.sign() == other.man.sign() {
            Sign::Plus
        } else {
            Sign::Minus
        };
        let exp = self.exp - other.exp - s;
        (Self::new(BigInt::from_biguint(sign, q), exp), Mag::pow2(exp))
    }

    /// Square root of a non-negative value truncated to roughly `prec` bits,
    /// with its error bound.
    pub fn sqrt_round(&self, prec: u64) -> (Dyadic, Mag) {
        if self.man.sign() != Sign::Plus {
            return (Self::zero(), Mag::zero());
        }
        let mut m: BigUint = self.man.magnitude().clone();
        let mut e = self.exp;
        if e.rem_euclid(2) == 1 {
            m <<= 1usize;
            e -= 1;
        }
        let want = 2 * (prec as i64 + 2);
        let k = ((want - m.bits() as i64 + 1) / 2).max(0);
        m <<= (2 * k) as usize;
        e -= 2 * k;
        let r = m.sqrt();
        let exp = e / 2;
        (Self::new(BigInt::from(r), exp), Mag::pow2(exp))
    }

    pub fn floor(&self) -> BigInt {
        if self.exp >= 0 {
            return &self.man << (self.exp as usize);
        }
        if self.top() <= 0 {
            return if self.is_negative() {
                -BigInt::one()
            } else {
                BigInt::zero()
            };
        }
        // Normalized with a negative exponent, so never an integer.
        let q = BigInt::from(self.man.magnitude() >> ((-self.exp) as usize));
        if self.is_negative() {
            -(q + BigInt::one())
        } else {
            q
        }
    }

    pub fn ceil(&self) -> BigInt {
        -self.neg().floor()
    }

    /// Nearest integer, ties upward.
    pub fn round_nearest(&self) -> BigInt {
        self.add(&Dyadic::new(BigInt::one(), -1)).floor()
    }

    pub fn is_integer(&self) -> bool {
        self.exp >= 0 || self.is_zero()
    }

    /// Upper bound of `|self|`.
    pub fn mag_upper(&self) -> Mag {
        self.to_mag(true)
    }

    /// Lower bound of `|self|`.
    pub fn mag_lower(&self) -> Mag {
        self.to_mag(false)
    }

    fn to_mag(&self, up: bool) -> Mag {
        if self.is_zero() {
            return Mag::zero();
        }
        let bits = self.bits();
        let mag = self.man.magnitude();
        if bits <= 64 {
            let m = mag.to_u64().unwrap_or(u64::MAX);
            return Mag::from_parts(m as u128, self.exp, up);
        }
        let shift = bits - 64;
        let top = (mag >> (shift as usize)).to_u64().unwrap_or(u64::MAX) as u128;
        // the discarded low part contains the odd bit
        let m = if up { top + 1 } else { top };
        Mag::from_parts(m, self.exp + shift as i64, up)
    }

    pub fn to_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        let bits = self.bits();
        let (m, e) = if bits > 60 {
            let shift = bits - 60;
            (
                (self.man.magnitude() >> (shift as usize)).to_u64().unwrap_or(0),
                self.exp + shift as i64,
            )
        } else {
            (self.man.magnitude().to_u64().unwrap_or(0), self.exp)
        };
        let half = e / 2;
        let v = m as f64 * pow2_f64(half) * pow2_f64(e - half);
        if self.is_negative() {
            -v
        } else {
            v
        }
    }
}

impl Ord for Dyadic {
    fn cmp(&self, other: &Self) -> Ordering {
        let (sa, sb) = (self.signum(), other.signum());
        if sa != sb {
            return sa.cmp(&sb);
        }
        self.sub(other).signum().cmp(&0)
    }
}

impl PartialOrd for Dyadic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for Dyadic {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Dyadic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:e}", self.to_f64())
    }
}
