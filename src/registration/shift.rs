//! Translation estimate from the masked correlation peak.

use crate::array::{ensure_same_shape, Element, MaskValue};
use crate::backend::{RustFftBackend, SpectralBackend};
use crate::registration::{CorrelationConfig, CorrelationMode, MaskedCorrelator};
use crate::trace::{trace_event, trace_span};
use crate::util::{MaskCorrError, MaskCorrResult};
use ndarray::{ArrayD, ArrayViewD};

/// Default minimum overlap ratio for registration.
pub const DEFAULT_OVERLAP_RATIO: f64 = 0.3;

/// Estimates the translation between two masked images.
#[derive(Clone, Debug)]
pub struct ShiftEstimator<S = RustFftBackend> {
    overlap_ratio: f64,
    backend: S,
}

impl Default for ShiftEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShiftEstimator {
    pub fn new() -> Self {
        Self {
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
            backend: RustFftBackend::new(),
        }
    }
}

impl<S: SpectralBackend + Clone> ShiftEstimator<S> {
    /// Sets the minimum overlap ratio passed to the correlator.
    pub fn with_overlap_ratio(mut self, overlap_ratio: f64) -> Self {
        self.overlap_ratio = overlap_ratio;
        self
    }

    /// Replaces the spectral backend.
    pub fn with_backend<T: SpectralBackend + Clone>(self, backend: T) -> ShiftEstimator<T> {
        ShiftEstimator {
            overlap_ratio: self.overlap_ratio,
            backend,
        }
    }

    pub fn overlap_ratio(&self) -> f64 {
        self.overlap_ratio
    }

    /// Returns the `(row, col)` shift that registers `moving` onto
    /// `reference`.
    ///
    /// Translations are evaluated over axes 0 and 1. When `moving_mask` is
    /// `None` the reference mask is reused, which requires both images to have
    /// the same shape. Ties between maxima are resolved by averaging their
    /// coordinates.
    pub fn estimate<A, B, M>(
        &self,
        reference: ArrayViewD<'_, A>,
        moving: ArrayViewD<'_, B>,
        reference_mask: ArrayViewD<'_, M>,
        moving_mask: Option<ArrayViewD<'_, M>>,
    ) -> MaskCorrResult<[f64; 2]>
    where
        A: Element,
        B: Element,
        M: MaskValue,
    {
        let inferred: ArrayD<M>;
        let moving_mask = match moving_mask {
            Some(mask) => mask.reborrow(),
            None => {
                if reference.shape() != moving.shape() {
                    return Err(MaskCorrError::AmbiguousMask {
                        reference: reference.shape().to_vec(),
                        moving: moving.shape().to_vec(),
                    });
                }
                inferred = reference_mask.to_owned();
                inferred.view()
            }
        };
        ensure_same_shape(
            "reference vs reference_mask",
            reference.shape(),
            reference_mask.shape(),
        )?;
        ensure_same_shape("moving vs moving_mask", moving.shape(), moving_mask.shape())?;

        let _span = trace_span!(
            "estimate_shift",
            rows = reference.shape().first().copied().unwrap_or(0),
            overlap_ratio = self.overlap_ratio
        )
        .entered();

        let ref_shape = reference.shape().to_vec();
        let mov_shape = moving.shape().to_vec();
        let correlator = MaskedCorrelator::new()
            .with_backend(self.backend.clone())
            .with_config(CorrelationConfig {
                mode: CorrelationMode::Full,
                axes: vec![0, 1],
                overlap_ratio: self.overlap_ratio,
            });
        let xcorr = correlator
            .correlate(moving, reference, moving_mask, reference_mask)?
            .surface;

        let center = peak_center(&xcorr);
        Ok(std::array::from_fn(|axis| {
            let offset = center[axis] - ref_shape[axis] as f64 + 1.0;
            let size_mismatch = mov_shape[axis] as f64 - ref_shape[axis] as f64;
            -offset + size_mismatch / 2.0
        }))
    }
}

/// Mean position of all global maxima along the first two axes.
fn peak_center(surface: &ArrayD<f64>) -> [f64; 2] {
    let peak = surface.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = [0.0f64; 2];
    let mut count = 0usize;
    for (index, &value) in surface.indexed_iter() {
        if value == peak {
            sum[0] += index[0] as f64;
            sum[1] += index[1] as f64;
            count += 1;
        }
    }
    trace_event!("correlation_peak", peak = peak, ties = count);
    sum.map(|s| s / count.max(1) as f64)
}

/// Estimates the translation between masked images with the default backend.
///
/// See [`ShiftEstimator::estimate`].
pub fn masked_phase_cross_correlation<A, B, M>(
    reference: ArrayViewD<'_, A>,
    moving: ArrayViewD<'_, B>,
    reference_mask: ArrayViewD<'_, M>,
    moving_mask: Option<ArrayViewD<'_, M>>,
    overlap_ratio: f64,
) -> MaskCorrResult<[f64; 2]>
where
    A: Element,
    B: Element,
    M: MaskValue,
{
    ShiftEstimator::new()
        .with_overlap_ratio(overlap_ratio)
        .estimate(reference, moving, reference_mask, moving_mask)
}
