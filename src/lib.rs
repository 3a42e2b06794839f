//! maskcorr computes multiscale pixel features and masked normalized
//! cross-correlation on n-dimensional arrays.
//!
//! Feature extraction stacks blurred intensity, Sobel magnitude and Hessian
//! eigenvalues over a geometric range of Gaussian scales. Registration
//! correlates two images under validity masks in the Fourier domain and
//! estimates the translation between them. Filtering and FFTs go through
//! pluggable backends, with optional parallelism via the `rayon` feature.

pub mod array;
pub mod backend;
pub mod features;
pub mod lowlevel;
pub mod registration;
mod trace;
pub mod util;

pub use ndarray;

pub use array::{DtypeKind, Element, MaskValue, Precision};
pub use backend::{CpuBackend, FeatureBackend, RustFftBackend, SpectralBackend};
pub use features::{multiscale_basic_features, FeatureConfig, FeatureExtractor, ScaleSet};
pub use registration::{
    cross_correlate_masked, masked_phase_cross_correlation, CorrelationConfig, CorrelationMode,
    MaskedCorrelation, MaskedCorrelator, ShiftEstimator,
};
pub use util::{MaskCorrError, MaskCorrResult};
