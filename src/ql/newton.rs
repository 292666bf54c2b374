use tracing::trace;

use crate::ball::{Acb, Ball};
use crate::error::{Result, ThetaError};

const MAX_STEPS: usize = 64;

/// Exact centre of a complex ball.
pub(crate) fn midpoint(x: &Acb) -> Acb {
    Acb::new(
        Ball::from_dyadic(x.re().mid().clone()),
        Ball::from_dyadic(x.im().mid().clone()),
    )
}

/// Square root of `w` selected by a low-precision `reference`.
///
/// Newton steps `x ← (x + w/x)/2` start from the centre of `reference` and
/// double the precision each time. The last iterate `r` is certified: when
/// `e = |w − r²| < |r|²`, the root of `w` closest to `r` lies within `e/|r|`
/// of `r`. The result must overlap `reference` while its negation does not,
/// otherwise the branch is ambiguous and more precision is needed.
pub fn newton_sqrt(w: &Acb, reference: &Acb, prec: u64) -> Result<Acb> {
    let fail = ThetaError::InsufficientPrecision {
        stage: "newton square root",
        prec,
    };
    if !w.is_finite() || !reference.is_finite() || reference.contains_zero() {
        return Err(fail);
    }
    let target = prec + 16;
    let wm = midpoint(w);
    let mut x = midpoint(reference);
    let mut p = reference.rel_accuracy_bits().clamp(16, target as i64) as u64;
    let mut steps = 0;
    while steps < MAX_STEPS {
        let next = midpoint(&x.add(&wm.div(&x, p + 8), p + 8).mul_2exp(-1).round(p));
        let delta = next.sub(&x, p + 8).mag_upper();
        x = next;
        steps += 1;
        if !x.is_finite() {
            break;
        }
        if p >= target && delta <= x.mag_upper().mul_2exp(-(target as i64)) {
            break;
        }
        p = (2 * p).min(target);
    }
    trace!(steps, prec, "newton square root");

    let e = w.sub(&x.sqr(target), target).mag_upper();
    let rx = x.mag_lower();
    if e >= rx.mul_lower(&rx) {
        return Err(fail);
    }
    let mut s = x;
    s.add_error(&e.div(&rx));
    if s.overlaps(reference) && !s.neg().overlaps(reference) {
        Ok(s.round(prec))
    } else {
        Err(fail)
    }
}
