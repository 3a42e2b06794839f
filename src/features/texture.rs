//! Finite-difference Hessian of a smoothed image.

use crate::util::{MaskCorrError, MaskCorrResult};
use ndarray::{ArrayD, ArrayViewD, Axis, Zip};

/// Derivative along `axis` with central differences in the interior and
/// one-sided first-order differences at both ends (`numpy.gradient`).
pub fn gradient(input: ArrayViewD<'_, f32>, axis: usize) -> MaskCorrResult<ArrayD<f32>> {
    let len = input.len_of(Axis(axis));
    if len < 2 {
        return Err(MaskCorrError::ArrayTooSmall { axis, len, min: 2 });
    }
    let mut output = ArrayD::<f32>::zeros(input.raw_dim());
    Zip::from(output.lanes_mut(Axis(axis)))
        .and(input.lanes(Axis(axis)))
        .for_each(|mut dst, src| {
            dst[0] = src[1] - src[0];
            dst[len - 1] = src[len - 1] - src[len - 2];
            for i in 1..len - 1 {
                dst[i] = 0.5 * (src[i + 1] - src[i - 1]);
            }
        });
    Ok(output)
}

/// Upper-triangle Hessian elements `H[a][b]` for `a <= b`, row-major.
///
/// Each element is `gradient(gradient(image, a), b)`; first derivatives are
/// computed once and reused.
pub fn hessian_elements(image: ArrayViewD<'_, f32>) -> MaskCorrResult<Vec<ArrayD<f32>>> {
    let ndim = image.ndim();
    let first = (0..ndim)
        .map(|axis| gradient(image.view(), axis))
        .collect::<MaskCorrResult<Vec<_>>>()?;
    let mut elements = Vec::with_capacity(ndim * (ndim + 1) / 2);
    for (a, d_a) in first.iter().enumerate() {
        for b in a..ndim {
            elements.push(gradient(d_a.view(), b)?);
        }
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::{gradient, hessian_elements};
    use crate::util::MaskCorrError;
    use ndarray::{arr1, Array, IxDyn};

    #[test]
    fn gradient_matches_numpy_edges() {
        let input = arr1(&[1.0f32, 2.0, 4.0, 7.0, 11.0]).into_dyn();
        let d = gradient(input.view(), 0).unwrap();
        assert_eq!(d, arr1(&[1.0f32, 1.5, 2.5, 3.5, 4.0]).into_dyn());
    }

    #[test]
    fn gradient_needs_two_samples() {
        let input = Array::<f32, _>::zeros(IxDyn(&[4, 1]));
        assert_eq!(
            gradient(input.view(), 1).unwrap_err(),
            MaskCorrError::ArrayTooSmall { axis: 1, len: 1, min: 2 }
        );
    }

    #[test]
    fn hessian_of_quadratic_is_constant_in_the_interior() {
        // f = x^2 + 3xy - y^2 has H = [[2, 3], [3, -2]].
        let image = Array::from_shape_fn(IxDyn(&[9, 9]), |ix| {
            let (x, y) = (ix[0] as f32, ix[1] as f32);
            x * x + 3.0 * x * y - y * y
        });
        let elements = hessian_elements(image.view()).unwrap();
        assert_eq!(elements.len(), 3);
        let expected = [2.0f32, 3.0, -2.0];
        for (element, want) in elements.iter().zip(expected) {
            for i in 2..7 {
                for j in 2..7 {
                    assert!((element[[i, j]] - want).abs() < 1e-3);
                }
            }
        }
    }
}
