use tracing::debug;

use crate::ball::Acb;
use crate::error::Result;
use crate::matrix::AcbMat;
use crate::naive::naive_a0_with_params;
use crate::params::ThetaParams;

/// Low-precision theta constants `θ_{a,0}(0, 2^j τ)` for `j < depth`,
/// certified non-zero. They select the square roots of the duplication
/// chain.
#[derive(Clone, Debug)]
pub struct ValidAgm {
    baseprec: u64,
    depth: usize,
    shrink: f64,
    refs: Vec<Vec<Acb>>,
}

impl ValidAgm {
    pub fn baseprec(&self) -> u64 {
        self.baseprec
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Reference values at level `j`, indexed by `a`.
    pub fn refs(&self, j: usize) -> &[Acb] {
        &self.refs[j]
    }

    /// Bits lost to the smallest theta constant at level `j`.
    pub fn extra_bits(&self, j: usize) -> u64 {
        extra_bits(self.shrink, j)
    }
}

/// `⌈2^j·d·log2(e)⌉`, the size in bits of `exp(−2^j d)`.
fn extra_bits(d: f64, j: usize) -> u64 {
    (d * (1u64 << j) as f64 * std::f64::consts::LOG2_E).ceil().max(0.0) as u64
}

/// State of the reference computation. A fresh value is built for every
/// attempt; failed attempts double the base precision.
#[derive(Clone, Debug)]
pub enum AgmContext {
    Uninitialized,
    Set {
        baseprec: u64,
        depth: usize,
        shrink: f64,
        refs: Vec<Vec<Acb>>,
    },
    Valid(ValidAgm),
    Invalid {
        baseprec: u64,
    },
}

impl AgmContext {
    /// Computes the reference constants at `baseprec` bits of relative
    /// precision. `shrink` is the largest squared distance of `dist_a0` at
    /// `z = 0`, so that `θ_{a,0}(0, 2^j τ)` is about `exp(−2^j shrink)` or
    /// larger.
    pub fn set_const(
        self,
        tau: &AcbMat,
        depth: usize,
        shrink: f64,
        baseprec: u64,
        params: &ThetaParams,
    ) -> Result<AgmContext> {
        let g = tau.rows();
        let zero = vec![vec![Acb::zero(); g]];
        let mut refs = Vec::with_capacity(depth);
        for j in 0..depth {
            let tau_j = tau.mul_2exp(j as i64);
            let prec = baseprec + extra_bits(shrink, j);
            match naive_a0_with_params(&zero, &tau_j, prec, params) {
                Ok(th) => refs.push(th),
                Err(err) if !err.is_fatal() => {
                    debug!(%err, baseprec, level = j, "agm reference failed");
                    return Ok(AgmContext::Invalid { baseprec });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(AgmContext::Set {
            baseprec,
            depth,
            shrink,
            refs,
        })
    }

    /// A context is valid once every reference is finite and excludes zero.
    pub fn validate(self) -> AgmContext {
        match self {
            AgmContext::Set {
                baseprec,
                depth,
                shrink,
                refs,
            } => {
                let ok = refs
                    .iter()
                    .flatten()
                    .all(|r| r.is_finite() && !r.contains_zero());
                if ok {
                    AgmContext::Valid(ValidAgm {
                        baseprec,
                        depth,
                        shrink,
                        refs,
                    })
                } else {
                    AgmContext::Invalid { baseprec }
                }
            }
            other => other,
        }
    }

    /// Runs attempts from `params.agm_baseprec`, doubling while the base
    /// precision stays within `prec / params.maxq_factor`. `None` means the
    /// caller should give up on duplication.
    pub fn establish(
        tau: &AcbMat,
        depth: usize,
        shrink: f64,
        prec: u64,
        params: &ThetaParams,
    ) -> Result<Option<ValidAgm>> {
        let mut baseprec = params.agm_baseprec;
        while baseprec <= prec / params.maxq_factor {
            let ctx = AgmContext::Uninitialized
                .set_const(tau, depth, shrink, baseprec, params)?
                .validate();
            match ctx {
                AgmContext::Valid(agm) => {
                    debug!(baseprec, depth, "agm context valid");
                    return Ok(Some(agm));
                }
                _ => {
                    debug!(baseprec, "agm context invalid, doubling");
                    baseprec *= 2;
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_at_generic_point() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.1, 1.2), (0.3, 0.2)], vec![(0.3, 0.2), (-0.2, 1.0)]]).unwrap();
        let params = ThetaParams::default();
        let agm = AgmContext::establish(&tau, 3, 1.0, 400, &params).unwrap().unwrap();
        assert_eq!(agm.depth(), 3);
        assert_eq!(agm.refs(2).len(), 4);
        assert!(agm.baseprec() >= params.agm_baseprec);
    }

    #[test]
    fn test_gives_up_at_low_precision() {
        let tau = AcbMat::from_c64_rows(&[vec![(0.0, 1.0)]]).unwrap();
        // 40 > 100 / 4, so not even one attempt is allowed
        let agm = AgmContext::establish(&tau, 2, 1.0, 100, &ThetaParams::default()).unwrap();
        assert!(agm.is_none());
    }

    #[test]
    fn test_invalid_context_is_kept() {
        let ctx = AgmContext::Set {
            baseprec: 40,
            depth: 1,
            shrink: 0.0,
            refs: vec![vec![Acb::zero()]],
        };
        assert!(matches!(ctx.validate(), AgmContext::Invalid { baseprec: 40 }));
        assert!(matches!(AgmContext::Uninitialized.validate(), AgmContext::Uninitialized));
    }
}
