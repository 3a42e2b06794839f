//! Masked normalized cross-correlation and translation registration.
//!
//! Implements Padfield's frequency-domain formulation: every windowed sum in
//! the normalized cross-correlation is expressed as a correlation with a mask
//! and evaluated with FFTs, so invalid pixels never contribute and the cost
//! does not depend on the mask shapes.

use crate::util::{MaskCorrError, MaskCorrResult};
use std::fmt;
use std::str::FromStr;

mod masked;
pub mod shift;

pub use masked::{cross_correlate_masked, MaskedCorrelation, MaskedCorrelator};
pub use shift::{masked_phase_cross_correlation, ShiftEstimator};

/// Extent of the correlation surface along the transformed axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CorrelationMode {
    /// Every translation with any overlap, `n1 + n2 - 1` per axis.
    #[default]
    Full,
    /// Central part of the full surface with the extent of the first array.
    Same,
}

impl CorrelationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CorrelationMode::Full => "full",
            CorrelationMode::Same => "same",
        }
    }
}

impl fmt::Display for CorrelationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorrelationMode {
    type Err = MaskCorrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(CorrelationMode::Full),
            "same" => Ok(CorrelationMode::Same),
            other => Err(MaskCorrError::InvalidMode {
                mode: other.to_string(),
            }),
        }
    }
}

/// Parameters of a masked correlation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CorrelationConfig {
    /// Output extent.
    pub mode: CorrelationMode,
    /// Axes to correlate over; negative values count from the last axis.
    pub axes: Vec<isize>,
    /// Minimum overlap, as a fraction of the largest overlap in the same
    /// slice, below which the surface is zeroed.
    pub overlap_ratio: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            mode: CorrelationMode::Full,
            axes: vec![-2, -1],
            overlap_ratio: 0.3,
        }
    }
}

impl CorrelationConfig {
    /// Validates the configuration parameters.
    ///
    /// Axis indices are resolved later against the input rank.
    pub fn validate(&self) -> MaskCorrResult<()> {
        if !self.overlap_ratio.is_finite() || self.overlap_ratio < 0.0 {
            return Err(MaskCorrError::InvalidConfiguration {
                reason: "overlap_ratio must be finite and non-negative",
            });
        }
        if self.axes.is_empty() {
            return Err(MaskCorrError::InvalidConfiguration {
                reason: "at least one transform axis is required",
            });
        }
        Ok(())
    }
}
