//! Python bindings for the maskcorr feature and registration library.
//!
//! The functions mirror the keyword names and defaults of the scikit-image
//! API they replace. Arrays are copied in and out; the numeric work runs in
//! Rust.

use numpy::ndarray as np_nd;
use numpy::{
    Complex32, Complex64, Element as NumpyElement, IntoPyArray, PyArray1, PyArrayDyn,
    PyReadonlyArrayDyn, PyUntypedArrayMethods,
};
use pyo3::exceptions::{PyTypeError, PyValueError};
use pyo3::prelude::*;

use maskcorr::ndarray::{ArrayD, IxDyn};
use maskcorr::{
    CorrelationConfig, CorrelationMode, Element, FeatureConfig, FeatureExtractor, MaskCorrError,
    MaskValue, MaskedCorrelator, ShiftEstimator,
};

/// Convert a MaskCorrError to a Python exception.
fn to_py_err(err: MaskCorrError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Copies a numpy array into an owned maskcorr array in logical order.
fn to_owned<T: NumpyElement + Copy>(array: &PyReadonlyArrayDyn<'_, T>) -> PyResult<ArrayD<T>> {
    let shape = array.shape().to_vec();
    let data: Vec<T> = array.as_array().iter().copied().collect();
    ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|e| to_py_err(e.into()))
}

/// Moves a maskcorr result into a new numpy array.
fn to_numpy<'py, T: NumpyElement + Copy>(
    py: Python<'py>,
    array: ArrayD<T>,
) -> PyResult<Bound<'py, PyArrayDyn<T>>> {
    let shape = array.shape().to_vec();
    let data: Vec<T> = array.iter().copied().collect();
    let out = np_nd::ArrayD::from_shape_vec(np_nd::IxDyn(&shape), data)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(out.into_pyarray(py))
}

/// Real image converted to the working precision its dtype requires.
enum RealImage {
    Single(ArrayD<f32>),
    Double(ArrayD<f64>),
}

fn is_complex(obj: &Bound<'_, PyAny>) -> bool {
    obj.extract::<PyReadonlyArrayDyn<'_, Complex32>>().is_ok()
        || obj.extract::<PyReadonlyArrayDyn<'_, Complex64>>().is_ok()
}

fn extract_real(obj: &Bound<'_, PyAny>, name: &str) -> PyResult<RealImage> {
    macro_rules! try_as {
        ($variant:ident, $float:ty; $($ty:ty),+) => {$(
            if let Ok(array) = obj.extract::<PyReadonlyArrayDyn<'_, $ty>>() {
                let owned = to_owned(&array)?;
                return Ok(RealImage::$variant(owned.mapv(|v| v.to_f64() as $float)));
            }
        )+};
    }

    try_as!(Single, f32; f32, bool, u8, i8, u16, i16);
    try_as!(Double, f64; f64, u32, i32, u64, i64);
    if is_complex(obj) {
        return Err(to_py_err(MaskCorrError::UnsupportedDtype {
            reason: "complex-valued arr1, arr2 are not supported",
        }));
    }
    Err(PyTypeError::new_err(format!(
        "{name} must be a numpy array of a boolean, integer or float dtype"
    )))
}

fn extract_mask(obj: &Bound<'_, PyAny>, name: &str) -> PyResult<ArrayD<bool>> {
    if let Ok(array) = obj.extract::<PyReadonlyArrayDyn<'_, bool>>() {
        return to_owned(&array);
    }
    macro_rules! try_as {
        ($($ty:ty),+) => {$(
            if let Ok(array) = obj.extract::<PyReadonlyArrayDyn<'_, $ty>>() {
                return Ok(to_owned(&array)?.mapv(MaskValue::is_valid));
            }
        )+};
    }
    try_as!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);
    Err(PyTypeError::new_err(format!(
        "{name} must be a numpy array of a boolean, integer or float dtype"
    )))
}

fn correlate_pair<A: Element, B: Element>(
    correlator: &MaskedCorrelator,
    arr1: &ArrayD<A>,
    arr2: &ArrayD<B>,
    m1: &ArrayD<bool>,
    m2: &ArrayD<bool>,
) -> Result<ArrayD<f64>, MaskCorrError> {
    correlator
        .correlate(arr1.view(), arr2.view(), m1.view(), m2.view())
        .map(|result| result.surface)
}

/// Masked normalized cross-correlation between arrays.
///
/// Args:
///     arr1: First (fixed) array.
///     arr2: Second (moving) array; extents along non-transformed axes must
///         equal those of `arr1`.
///     m1: Mask of `arr1`; non-zero marks valid pixels.
///     m2: Mask of `arr2`; non-zero marks valid pixels.
///     mode: "full" or "same" (default: "full")
///     axes: Axes to correlate over (default: (-2, -1))
///     overlap_ratio: Minimum relative overlap (default: 0.3)
#[pyfunction]
#[pyo3(signature = (arr1, arr2, m1, m2, mode = "full", axes = vec![-2, -1], overlap_ratio = 0.3))]
#[allow(clippy::too_many_arguments)]
fn cross_correlate_masked<'py>(
    py: Python<'py>,
    arr1: &Bound<'py, PyAny>,
    arr2: &Bound<'py, PyAny>,
    m1: &Bound<'py, PyAny>,
    m2: &Bound<'py, PyAny>,
    mode: &str,
    axes: Vec<isize>,
    overlap_ratio: f64,
) -> PyResult<Bound<'py, PyArrayDyn<f64>>> {
    let mode: CorrelationMode = mode.parse().map_err(to_py_err)?;
    if is_complex(arr1) || is_complex(arr2) {
        return Err(to_py_err(MaskCorrError::UnsupportedDtype {
            reason: "complex-valued arr1, arr2 are not supported",
        }));
    }
    let fixed = extract_real(arr1, "arr1")?;
    let moving = extract_real(arr2, "arr2")?;
    let m1 = extract_mask(m1, "m1")?;
    let m2 = extract_mask(m2, "m2")?;

    let correlator = MaskedCorrelator::new().with_config(CorrelationConfig {
        mode,
        axes,
        overlap_ratio,
    });
    let surface = match (&fixed, &moving) {
        (RealImage::Single(a), RealImage::Single(b)) => correlate_pair(&correlator, a, b, &m1, &m2),
        (RealImage::Single(a), RealImage::Double(b)) => correlate_pair(&correlator, a, b, &m1, &m2),
        (RealImage::Double(a), RealImage::Single(b)) => correlate_pair(&correlator, a, b, &m1, &m2),
        (RealImage::Double(a), RealImage::Double(b)) => correlate_pair(&correlator, a, b, &m1, &m2),
    }
    .map_err(to_py_err)?;
    to_numpy(py, surface)
}

/// Masked image translation registration.
///
/// Args:
///     reference_image: Reference image.
///     moving_image: Image to register; may differ in shape from the
///         reference if `moving_mask` is given.
///     reference_mask: Valid pixels of the reference image.
///     moving_mask: Valid pixels of the moving image (default: the
///         reference mask, which requires equal shapes).
///     overlap_ratio: Minimum relative overlap (default: 0.3)
///
/// Returns:
///     The (row, col) shift that registers the moving image onto the
///     reference image.
#[pyfunction]
#[pyo3(signature = (reference_image, moving_image, reference_mask, moving_mask = None, overlap_ratio = 0.3))]
fn masked_phase_cross_correlation<'py>(
    py: Python<'py>,
    reference_image: &Bound<'py, PyAny>,
    moving_image: &Bound<'py, PyAny>,
    reference_mask: &Bound<'py, PyAny>,
    moving_mask: Option<&Bound<'py, PyAny>>,
    overlap_ratio: f64,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let reference = extract_real(reference_image, "reference_image")?;
    let moving = extract_real(moving_image, "moving_image")?;
    let reference_mask = extract_mask(reference_mask, "reference_mask")?;
    let moving_mask = moving_mask
        .map(|mask| extract_mask(mask, "moving_mask"))
        .transpose()?;

    let estimator = ShiftEstimator::new().with_overlap_ratio(overlap_ratio);
    let rm = reference_mask.view();
    let mm = moving_mask.as_ref().map(|m| m.view());
    let shift = match (&reference, &moving) {
        (RealImage::Single(r), RealImage::Single(m)) => estimator.estimate(r.view(), m.view(), rm, mm),
        (RealImage::Single(r), RealImage::Double(m)) => estimator.estimate(r.view(), m.view(), rm, mm),
        (RealImage::Double(r), RealImage::Single(m)) => estimator.estimate(r.view(), m.view(), rm, mm),
        (RealImage::Double(r), RealImage::Double(m)) => estimator.estimate(r.view(), m.view(), rm, mm),
    }
    .map_err(to_py_err)?;
    Ok(shift.to_vec().into_pyarray(py))
}

/// Local features for a single- or multi-channel nd image.
///
/// Args:
///     image: Input image, grayscale or with channels on the last axis.
///     multichannel: Treat the last axis as channels (default: False)
///     intensity: Include blurred intensities (default: True)
///     edges: Include Sobel magnitudes (default: True)
///     texture: Include Hessian eigenvalues (default: True)
///     sigma_min: Smallest Gaussian sigma (default: 0.5)
///     sigma_max: Largest Gaussian sigma (default: 16)
///     num_sigma: Number of scales (default: one per octave)
///     num_workers: Values above one run scales in parallel (default: None)
#[pyfunction]
#[pyo3(signature = (
    image,
    multichannel = false,
    intensity = true,
    edges = true,
    texture = true,
    sigma_min = 0.5,
    sigma_max = 16.0,
    num_sigma = None,
    num_workers = None
))]
#[allow(clippy::too_many_arguments)]
fn multiscale_basic_features<'py>(
    py: Python<'py>,
    image: &Bound<'py, PyAny>,
    multichannel: bool,
    intensity: bool,
    edges: bool,
    texture: bool,
    sigma_min: f32,
    sigma_max: f32,
    num_sigma: Option<usize>,
    num_workers: Option<usize>,
) -> PyResult<Bound<'py, PyArrayDyn<f32>>> {
    let extractor = FeatureExtractor::new().with_config(FeatureConfig {
        intensity,
        edges,
        texture,
        sigma_min,
        sigma_max,
        num_sigma,
        parallel: num_workers.is_some_and(|n| n > 1),
    });

    macro_rules! try_as {
        ($($ty:ty),+) => {$(
            if let Ok(array) = image.extract::<PyReadonlyArrayDyn<'_, $ty>>() {
                let owned = to_owned(&array)?;
                let features = extractor
                    .compute(owned.view(), multichannel)
                    .map_err(to_py_err)?;
                return to_numpy(py, features);
            }
        )+};
    }
    try_as!(f32, f64, bool, u8, i8, u16, i16, u32, i32, u64, i64);
    if is_complex(image) {
        return Err(to_py_err(MaskCorrError::UnsupportedDtype {
            reason: "feature extraction requires real-valued images",
        }));
    }
    Err(PyTypeError::new_err(
        "image must be a numpy array of a boolean, integer or float dtype",
    ))
}

/// Python module for maskcorr.
#[pymodule]
fn _maskcorr(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(cross_correlate_masked, m)?)?;
    m.add_function(wrap_pyfunction!(masked_phase_cross_correlation, m)?)?;
    m.add_function(wrap_pyfunction!(multiscale_basic_features, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
