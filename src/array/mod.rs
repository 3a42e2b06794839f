//! Array plumbing shared by the pipelines.
//!
//! All helpers work on dynamic-rank `ndarray` views. Slicing helpers return
//! zero-copy views into the same buffer; only reductions allocate.

use crate::util::{MaskCorrError, MaskCorrResult, Real};
use ndarray::{ArrayD, ArrayViewD, Axis, Slice};

mod element;

pub use element::{DtypeKind, Element, MaskValue, Precision};

/// Resolves numpy-style (possibly negative) axes against `ndim`.
///
/// Rejects empty lists, out-of-range indices and repeated axes.
pub fn normalize_axes(axes: &[isize], ndim: usize) -> MaskCorrResult<Vec<usize>> {
    if axes.is_empty() {
        return Err(MaskCorrError::InvalidConfiguration {
            reason: "at least one transform axis is required",
        });
    }
    let rank = ndim as isize;
    let mut out = Vec::with_capacity(axes.len());
    for &axis in axes {
        let resolved = if axis < 0 { axis + rank } else { axis };
        if resolved < 0 || resolved >= rank {
            return Err(MaskCorrError::AxisOutOfBounds { axis, ndim });
        }
        let resolved = resolved as usize;
        if out.contains(&resolved) {
            return Err(MaskCorrError::DuplicateAxis { axis: resolved });
        }
        out.push(resolved);
    }
    Ok(out)
}

/// Reverses `view` along every axis in `axes`.
pub fn flip_axes<'a, T>(mut view: ArrayViewD<'a, T>, axes: &[usize]) -> ArrayViewD<'a, T> {
    for &axis in axes {
        view.invert_axis(Axis(axis));
    }
    view
}

/// Leading sub-array of `view` with extents `shape` (`view[:s0, :s1, ...]`).
pub fn leading<'a, T>(mut view: ArrayViewD<'a, T>, shape: &[usize]) -> ArrayViewD<'a, T> {
    view.slice_each_axis_inplace(|desc| {
        let end = shape[desc.axis.index()].min(desc.len);
        Slice::from(0..end)
    });
    view
}

/// Central `shape` portion of `view` along `axes`; other axes are untouched.
///
/// The crop starts at `(current - new) / 2`, matching the `same` convention
/// of correlation and convolution routines.
pub fn centered<'a, T>(
    mut view: ArrayViewD<'a, T>,
    shape: &[usize],
    axes: &[usize],
) -> ArrayViewD<'a, T> {
    view.slice_each_axis_inplace(|desc| {
        let axis = desc.axis.index();
        if !axes.contains(&axis) {
            return Slice::from(..);
        }
        let new_len = shape[axis].min(desc.len);
        let start = (desc.len - new_len) / 2;
        Slice::from(start..start + new_len)
    });
    view
}

/// Maximum of `map(x)` over `axes`, keeping reduced axes with length one.
///
/// The result broadcasts against `array` and holds one value per slice of
/// the non-reduced axes.
pub fn max_over_axes<F: Real>(
    array: ArrayViewD<'_, F>,
    axes: &[usize],
    map: impl Fn(F) -> F,
) -> ArrayD<F> {
    let mut out = array.mapv(map);
    for &axis in axes {
        out = out
            .fold_axis(Axis(axis), F::neg_infinity(), |&acc, &v| acc.max(v))
            .insert_axis(Axis(axis));
    }
    out
}

/// Checks that two shapes are identical.
pub(crate) fn ensure_same_shape(
    context: &'static str,
    expected: &[usize],
    got: &[usize],
) -> MaskCorrResult<()> {
    if expected != got {
        return Err(MaskCorrError::ShapeMismatch {
            context,
            expected: expected.to_vec(),
            got: got.to_vec(),
        });
    }
    Ok(())
}
