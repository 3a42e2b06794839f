//! Low-level building blocks for custom feature and registration pipelines.
//!
//! These expose the filters, the eigensolver, the FFT helpers and the array
//! views used internally by the high-level `FeatureExtractor`,
//! `MaskedCorrelator` and `ShiftEstimator`. Most users should prefer those
//! types.

pub use crate::array::{centered, flip_axes, leading, max_over_axes, normalize_axes};
pub use crate::backend::eigen::symmetric_eigenvalues;
pub use crate::backend::fft::next_fast_len;
pub use crate::backend::filters::{
    correlate1d, gaussian_filter, gaussian_kernel, sobel_magnitude, BoundaryMode,
};
pub use crate::features::texture::{gradient, hessian_elements};
pub use crate::registration::shift::DEFAULT_OVERLAP_RATIO;
pub use crate::util::Real;
