//! Error types for maskcorr.

use thiserror::Error;

/// Result alias for maskcorr operations.
pub type MaskCorrResult<T> = std::result::Result<T, MaskCorrError>;

/// Errors that can occur when running maskcorr algorithms.
///
/// Every variant is raised before any array computation starts; numerical
/// degeneracies (empty overlap, vanishing variance) are masked to zero in the
/// outputs instead of being reported here.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MaskCorrError {
    /// The configuration cannot produce any output.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: &'static str },
    /// The correlation mode string is not one of `full` or `same`.
    #[error("correlation mode '{mode}' is not valid")]
    InvalidMode { mode: String },
    /// The input element type is not supported (complex data).
    #[error("unsupported dtype: {reason}")]
    UnsupportedDtype { reason: &'static str },
    /// Two shapes that must agree do not.
    #[error("shape mismatch ({context}): expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// The moving mask was omitted but cannot be inferred.
    #[error(
        "input images have different shapes ({reference:?} vs {moving:?}), \
         moving_mask must be set explicitly"
    )]
    AmbiguousMask {
        reference: Vec<usize>,
        moving: Vec<usize>,
    },
    /// An axis index does not exist for the given rank.
    #[error("axis {axis} is out of bounds for an array of rank {ndim}")]
    AxisOutOfBounds { axis: isize, ndim: usize },
    /// An axis was listed more than once.
    #[error("axis {axis} is listed more than once")]
    DuplicateAxis { axis: usize },
    /// An array is too short along an axis for the requested operation.
    #[error("axis {axis} has length {len}, at least {min} required")]
    ArrayTooSmall { axis: usize, len: usize, min: usize },
    /// The array layout cannot be handled.
    #[error("invalid shape: {reason}")]
    InvalidShape { reason: String },
    /// A backend collaborator failed.
    #[error("backend failure: {reason}")]
    Backend { reason: String },
}

impl From<ndarray::ShapeError> for MaskCorrError {
    fn from(err: ndarray::ShapeError) -> Self {
        MaskCorrError::InvalidShape {
            reason: err.to_string(),
        }
    }
}
