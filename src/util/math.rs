//! Numeric helpers shared by the feature and correlation pipelines.

use ndarray::ScalarOperand;
use rustfft::num_traits::Float;
use rustfft::FftNum;

/// Floating-point working precision for spectral computations.
///
/// Implemented for `f32` and `f64`; the correlator picks one of them from the
/// element types of its inputs.
pub trait Real: Float + FftNum + ScalarOperand + Default {
    /// Converts from `f64`, rounding to the nearest representable value.
    fn cast(value: f64) -> Self;
    /// Widens to `f64` without loss.
    fn widen(self) -> f64;
}

impl Real for f32 {
    #[inline]
    fn cast(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn widen(self) -> f64 {
        f64::from(self)
    }
}

impl Real for f64 {
    #[inline]
    fn cast(value: f64) -> Self {
        value
    }

    #[inline]
    fn widen(self) -> f64 {
        self
    }
}

/// Returns `num` values spaced evenly on a base-2 log scale between
/// `2^start` and `2^stop`, both endpoints included.
pub(crate) fn logspace_base2(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start.exp2()],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| {
                    if i == num - 1 {
                        stop.exp2()
                    } else {
                        (start + step * i as f64).exp2()
                    }
                })
                .collect()
        }
    }
}
