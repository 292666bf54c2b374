use std::cmp::Ordering;
use std::fmt;

/// Number of mantissa bits kept in a radius.
pub(crate) const MAG_BITS: u32 = 30;
const INF_EXP: i64 = i64::MAX / 4;

/// Non-negative radius `man * 2^exp`, kept as an upper bound.
///
/// The mantissa is either zero or normalized to `[2^29, 2^30)`. Every
/// operation whose name does not end in `_lower` rounds up, so a chain of
/// operations on radii never underestimates an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Mag {
    man: u64,
    exp: i64,
}

/// Exact `2^e` as an `f64`, saturating to `0` and `inf`.
pub(crate) fn pow2_f64(e: i64) -> f64 {
    if e > 1023 {
        f64::INFINITY
    } else if e >= -1022 {
        f64::from_bits(((e + 1023) as u64) << 52)
    } else if e >= -1074 {
        f64::from_bits(1u64 << (e + 1074))
    } else {
        0.0
    }
}

/// Splits a positive finite `f64` into an exact `(mantissa, exponent)` pair.
pub(crate) fn decompose_f64(x: f64) -> (u64, i64) {
    let bits = x.abs().to_bits();
    let e = ((bits >> 52) & 0x7ff) as i64;
    let f = bits & ((1u64 << 52) - 1);
    if e == 0 {
        (f, -1074)
    } else {
        (f | (1u64 << 52), e - 1075)
    }
}

fn isqrt_u128(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = (n as f64).sqrt() as u128;
    while x * x > n {
        x -= 1;
    }
    while (x + 1) * (x + 1) <= n {
        x += 1;
    }
    x
}

impl Mag {
    pub const fn zero() -> Self {
        Self { man: 0, exp: 0 }
    }

    pub const fn inf() -> Self {
        Self {
            man: 1 << (MAG_BITS - 1),
            exp: INF_EXP,
        }
    }

    pub fn one() -> Self {
        Self::pow2(0)
    }

    pub fn pow2(e: i64) -> Self {
        Self::normalize(1, e, true)
    }

    pub fn from_u64(n: u64) -> Self {
        Self::normalize(n as u128, 0, true)
    }

    /// Smallest radius not below `x`. Non-finite input gives infinity.
    pub fn from_f64(x: f64) -> Self {
        if !x.is_finite() {
            return Self::inf();
        }
        if x == 0.0 {
            return Self::zero();
        }
        let (m, e) = decompose_f64(x);
        Self::normalize(m as u128, e, true)
    }

    pub(crate) fn from_parts(man: u128, exp: i64, up: bool) -> Self {
        Self::normalize(man, exp, up)
    }

    fn normalize(man: u128, exp: i64, up: bool) -> Self {
        if man == 0 {
            return Self::zero();
        }
        let bits = 128 - man.leading_zeros() as i64;
        let shift = bits - MAG_BITS as i64;
        let (mut m, mut e) = if shift > 0 {
            let m = man >> shift;
            let dropped = man & ((1u128 << shift) - 1);
            let m = if up && dropped != 0 { m + 1 } else { m };
            (m, exp.saturating_add(shift))
        } else {
            (man << (-shift), exp.saturating_add(shift))
        };
        if m >> MAG_BITS != 0 {
            m >>= 1;
            e = e.saturating_add(1);
        }
        if e >= INF_EXP {
            return Self::inf();
        }
        Self { man: m as u64, exp: e }
    }

    pub fn man(&self) -> u64 {
        self.man
    }

    pub fn exp(&self) -> i64 {
        self.exp
    }

    pub fn is_zero(&self) -> bool {
        self.man == 0
    }

    pub fn is_inf(&self) -> bool {
        self.exp >= INF_EXP
    }

    /// `e` such that the value is below `2^e`.
    pub fn log2_ceil(&self) -> i64 {
        if self.is_zero() {
            i64::MIN / 4
        } else {
            self.exp.saturating_add(MAG_BITS as i64)
        }
    }

    pub fn add(&self, other: &Mag) -> Mag {
        if self.is_inf() || other.is_inf() {
            return Self::inf();
        }
        if self.is_zero() {
            return *other;
        }
        if other.is_zero() {
            return *self;
        }
        let (hi, lo) = if self.exp >= other.exp {
            (self, other)
        } else {
            (other, self)
        };
        let d = hi.exp - lo.exp;
        if d > 64 {
            return Self::normalize(((hi.man as u128) << 2) | 1, hi.exp - 2, true);
        }
        let m = ((hi.man as u128) << d) + lo.man as u128;
        Self::normalize(m, lo.exp, true)
    }

    /// Lower bound for `max(self - other, 0)`.
    pub fn sub_lower(&self, other: &Mag) -> Mag {
        if other.is_zero() || self.is_zero() {
            return *self;
        }
        if other.is_inf() {
            return Self::zero();
        }
        if self.is_inf() {
            return *self;
        }
        if self.exp < other.exp {
            return Self::zero();
        }
        let d = self.exp - other.exp;
        if d > 64 {
            return Self::normalize(((self.man as u128) << 2) - 1, self.exp - 2, false);
        }
        let a = (self.man as u128) << d;
        let b = other.man as u128;
        if a <= b {
            return Self::zero();
        }
        Self::normalize(a - b, other.exp, false)
    }

    fn mul_impl(&self, other: &Mag, up: bool) -> Mag {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        if self.is_inf() || other.is_inf() {
            return Self::inf();
        }
        Self::normalize(
            self.man as u128 * other.man as u128,
            self.exp.saturating_add(other.exp),
            up,
        )
    }

    pub fn mul(&self, other: &Mag) -> Mag {
        self.mul_impl(other, true)
    }

    pub fn mul_lower(&self, other: &Mag) -> Mag {
        self.mul_impl(other, false)
    }

    fn div_impl(&self, other: &Mag, up: bool) -> Mag {
        if self.is_zero() {
            return Self::zero();
        }
        if other.is_zero() || self.is_inf() {
            return if up { Self::inf() } else { Self::zero() };
        }
        if other.is_inf() {
            return Self::zero();
        }
        let num = (self.man as u128) << 64;
        let den = other.man as u128;
        let mut q = num / den;
        if up && num % den != 0 {
            q += 1;
        }
        Self::normalize(q, self.exp.saturating_sub(other.exp).saturating_sub(64), up)
    }

    pub fn div(&self, other: &Mag) -> Mag {
        self.div_impl(other, true)
    }

    pub fn div_lower(&self, other: &Mag) -> Mag {
        self.div_impl(other, false)
    }

    pub fn mul_2exp(&self, e: i64) -> Mag {
        if self.is_zero() || self.is_inf() {
            return *self;
        }
        Self::normalize(self.man as u128, self.exp.saturating_add(e), true)
    }

    fn sqrt_impl(&self, up: bool) -> Mag {
        if self.is_zero() || self.is_inf() {
            return *self;
        }
        let mut m = self.man as u128;
        let mut e = self.exp;
        if e.rem_euclid(2) == 1 {
            m <<= 1;
            e -= 1;
        }
        let big = m << 64;
        e -= 64;
        let mut r = isqrt_u128(big);
        if up && r * r < big {
            r += 1;
        }
        Self::normalize(r, e / 2, up)
    }

    pub fn sqrt(&self) -> Mag {
        self.sqrt_impl(true)
    }

    pub fn sqrt_lower(&self) -> Mag {
        self.sqrt_impl(false)
    }

    /// `self^n`, rounded up.
    pub fn pow_ui(&self, n: u64) -> Mag {
        let mut result = Mag::one();
        let mut base = *self;
        let mut k = n;
        while k > 0 {
            if k & 1 == 1 {
                result = result.mul(&base);
            }
            base = base.mul(&base);
            k >>= 1;
        }
        result
    }

    pub fn to_f64(&self) -> f64 {
        if self.is_inf() {
            return f64::INFINITY;
        }
        let half = self.exp / 2;
        self.man as f64 * pow2_f64(half) * pow2_f64(self.exp - half)
    }
}

impl Ord for Mag {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        self.exp
            .cmp(&other.exp)
            .then_with(|| self.man.cmp(&other.man))
    }
}

impl PartialOrd for Mag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for Mag {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Mag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:e}", self.to_f64())
    }
}
