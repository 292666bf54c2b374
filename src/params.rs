use crate::error::{Result, ThetaError};

/// Tuning knobs for the evaluation pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct ThetaParams {
    pub low_prec: u64,      // Precision of sign references and calibration
    pub agm_baseprec: u64,  // Starting precision of the AGM reference values
    pub maxq_factor: u64,   // Give up on the AGM context once baseprec > prec / maxq_factor
    pub max_reduce_steps: usize,
    pub lll_delta: f64,
    pub guard_bits: u64,
    pub par_threshold: usize, // Fan out with rayon from this many independent jobs
}

impl Default for ThetaParams {
    fn default() -> Self {
        Self {
            low_prec: 64,
            agm_baseprec: 40,
            maxq_factor: 4,
            max_reduce_steps: 100,
            lll_delta: 0.99,
            guard_bits: 16,
            par_threshold: 4,
        }
    }
}

impl ThetaParams {
    pub fn validate(&self) -> Result<()> {
        if self.lll_delta <= 0.25 || self.lll_delta >= 1.0 {
            return Err(ThetaError::InvalidParameters(
                "Delta must be in (0.25, 1.0)".to_string(),
            ));
        }
        if self.low_prec < 16 {
            return Err(ThetaError::InvalidParameters(
                "Low precision must be at least 16 bits".to_string(),
            ));
        }
        if self.agm_baseprec == 0 || self.maxq_factor == 0 {
            return Err(ThetaError::InvalidParameters(
                "AGM base precision and MAXQ factor must be positive".to_string(),
            ));
        }
        if self.max_reduce_steps == 0 {
            return Err(ThetaError::InvalidParameters(
                "At least one reduction step is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ThetaParams::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_delta() {
        let params = ThetaParams {
            lll_delta: 1.0,
            ..ThetaParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ThetaError::InvalidParameters(_))
        ));
    }
}
