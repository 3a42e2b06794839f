//! Compute backends consumed by the feature and registration pipelines.
//!
//! The pipelines only talk to the traits in this module. `CpuBackend` and
//! `RustFftBackend` are the default implementations; custom backends can be
//! injected with `with_backend` on the engines.

use crate::util::{MaskCorrResult, Real};
use ndarray::{ArrayD, ArrayViewD};
use rustfft::num_complex::Complex;

pub mod eigen;
pub mod fft;
pub mod filters;

pub use fft::{next_fast_len, RustFftBackend};

/// Filtering operations used by multiscale feature extraction.
pub trait FeatureBackend: Send + Sync {
    /// Isotropic Gaussian blur with standard deviation `sigma`.
    fn gaussian(&self, image: ArrayViewD<'_, f32>, sigma: f32) -> MaskCorrResult<ArrayD<f32>>;

    /// Sobel gradient magnitude, same shape as `image`.
    fn sobel(&self, image: ArrayViewD<'_, f32>) -> MaskCorrResult<ArrayD<f32>>;

    /// Eigenvalues of per-pixel symmetric matrices, ascending.
    ///
    /// `elements` holds the upper triangle in row-major order, one array per
    /// element; the result holds one array per eigenvalue index.
    fn hessian_eigenvalues(&self, elements: &[ArrayD<f32>]) -> MaskCorrResult<Vec<ArrayD<f32>>>;
}

/// Forward/inverse FFT pair over a subset of axes.
pub trait SpectralBackend: Send + Sync {
    /// Zero-pads (or truncates) `input` to `lengths` along `axes` and returns
    /// its unnormalized forward transform over those axes.
    fn forward<F: Real>(
        &self,
        input: ArrayViewD<'_, F>,
        axes: &[usize],
        lengths: &[usize],
    ) -> MaskCorrResult<ArrayD<Complex<F>>>;

    /// Inverse transform over `axes`, normalized by the transformed size.
    fn inverse<F: Real>(
        &self,
        spectrum: ArrayD<Complex<F>>,
        axes: &[usize],
    ) -> MaskCorrResult<ArrayD<Complex<F>>>;

    /// Transform length `>= n` that this backend handles efficiently.
    fn next_fast_len(&self, n: usize) -> usize;
}

/// Default feature backend: separable CPU filters and a per-pixel
/// eigensolver.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl FeatureBackend for CpuBackend {
    fn gaussian(&self, image: ArrayViewD<'_, f32>, sigma: f32) -> MaskCorrResult<ArrayD<f32>> {
        Ok(filters::gaussian_filter(image, sigma))
    }

    fn sobel(&self, image: ArrayViewD<'_, f32>) -> MaskCorrResult<ArrayD<f32>> {
        Ok(filters::sobel_magnitude(image))
    }

    fn hessian_eigenvalues(&self, elements: &[ArrayD<f32>]) -> MaskCorrResult<Vec<ArrayD<f32>>> {
        eigen::symmetric_eigenvalues(elements)
    }
}
