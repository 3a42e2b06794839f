//! Gaussian scale sets.

use crate::util::math::logspace_base2;
use crate::util::{MaskCorrError, MaskCorrResult};

/// Ordered, strictly increasing set of positive smoothing scales.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleSet {
    sigmas: Vec<f32>,
}

impl ScaleSet {
    /// Builds a geometric progression from `sigma_min` to `sigma_max`.
    ///
    /// `num_sigma` defaults to one scale per octave,
    /// `floor(log2(sigma_max) - log2(sigma_min) + 1)`. Both endpoints are
    /// included; a single scale yields `[sigma_min]`.
    pub fn geometric(
        sigma_min: f32,
        sigma_max: f32,
        num_sigma: Option<usize>,
    ) -> MaskCorrResult<Self> {
        if !sigma_min.is_finite() || !sigma_max.is_finite() || sigma_min <= 0.0 {
            return Err(MaskCorrError::InvalidConfiguration {
                reason: "sigma range must be finite and positive",
            });
        }
        if sigma_max < sigma_min {
            return Err(MaskCorrError::InvalidConfiguration {
                reason: "sigma_max must not be smaller than sigma_min",
            });
        }
        let lo = f64::from(sigma_min).log2();
        let hi = f64::from(sigma_max).log2();
        let count = match num_sigma {
            Some(0) => {
                return Err(MaskCorrError::InvalidConfiguration {
                    reason: "num_sigma must be at least 1",
                })
            }
            Some(n) => n,
            None => (hi - lo + 1.0).floor() as usize,
        };
        let sigmas = logspace_base2(lo, hi, count)
            .into_iter()
            .map(|s| s as f32)
            .collect();
        Ok(Self { sigmas })
    }

    /// Wraps explicit scales after checking they are positive and strictly
    /// increasing.
    pub fn from_sigmas(sigmas: Vec<f32>) -> MaskCorrResult<Self> {
        if sigmas.is_empty() {
            return Err(MaskCorrError::InvalidConfiguration {
                reason: "scale set must not be empty",
            });
        }
        if sigmas.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(MaskCorrError::InvalidConfiguration {
                reason: "scales must be finite and positive",
            });
        }
        if sigmas.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MaskCorrError::InvalidConfiguration {
                reason: "scales must be strictly increasing",
            });
        }
        Ok(Self { sigmas })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sigmas.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sigmas.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.sigmas
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.sigmas.iter().copied()
    }
}
