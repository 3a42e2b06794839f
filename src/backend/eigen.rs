//! Per-pixel eigenvalues of symmetric Hessian matrices.
//!
//! Elements arrive as the upper triangle in row-major order:
//! `H00, H01, ..., H0(n-1), H11, ..., H(n-1)(n-1)`.

use crate::util::{MaskCorrError, MaskCorrResult};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{ArrayD, IxDyn};

/// Returns the matrix size `n` with `n * (n + 1) / 2 == count`.
fn matrix_size(count: usize) -> Option<usize> {
    (1..=count).find(|&n| n * (n + 1) / 2 == count)
}

/// Computes ascending eigenvalues at every pixel.
///
/// Returns one array per eigenvalue index, shaped like the inputs. Ranks one
/// and two use closed forms; larger matrices go through
/// `nalgebra::SymmetricEigen`.
pub fn symmetric_eigenvalues(elements: &[ArrayD<f32>]) -> MaskCorrResult<Vec<ArrayD<f32>>> {
    let n = matrix_size(elements.len()).ok_or_else(|| MaskCorrError::Backend {
        reason: format!(
            "{} Hessian elements do not form a symmetric matrix",
            elements.len()
        ),
    })?;
    let shape = elements[0].shape().to_vec();
    for element in elements.iter().skip(1) {
        if element.shape() != shape.as_slice() {
            return Err(MaskCorrError::ShapeMismatch {
                context: "hessian elements",
                expected: shape,
                got: element.shape().to_vec(),
            });
        }
    }

    let flat: Vec<Vec<f32>> = elements.iter().map(|e| e.iter().copied().collect()).collect();
    let pixels = flat[0].len();
    let mut out: Vec<Vec<f32>> = (0..n).map(|_| Vec::with_capacity(pixels)).collect();

    match n {
        1 => out[0].extend_from_slice(&flat[0]),
        2 => {
            for p in 0..pixels {
                let (a, b, c) = (flat[0][p], flat[1][p], flat[2][p]);
                let mean = 0.5 * (a + c);
                let radius = (0.25 * (a - c) * (a - c) + b * b).sqrt();
                out[0].push(mean - radius);
                out[1].push(mean + radius);
            }
        }
        _ => {
            let mut upper = vec![(0usize, 0usize); flat.len()];
            let mut idx = 0;
            for row in 0..n {
                for col in row..n {
                    upper[idx] = (row, col);
                    idx += 1;
                }
            }
            for p in 0..pixels {
                let mut matrix = DMatrix::<f64>::zeros(n, n);
                for (&(row, col), values) in upper.iter().zip(&flat) {
                    let v = f64::from(values[p]);
                    matrix[(row, col)] = v;
                    matrix[(col, row)] = v;
                }
                let mut eigenvalues: Vec<f64> =
                    SymmetricEigen::new(matrix).eigenvalues.iter().copied().collect();
                eigenvalues.sort_by(f64::total_cmp);
                for (slot, value) in out.iter_mut().zip(eigenvalues) {
                    slot.push(value as f32);
                }
            }
        }
    }

    out.into_iter()
        .map(|values| ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(MaskCorrError::from))
        .collect()
}
