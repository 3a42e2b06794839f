//! Separable n-D filters on `f32` arrays.
//!
//! Every filter is a chain of 1-D correlations along single axes. Out of
//! range taps are resolved by a [`BoundaryMode`]; the Gaussian uses
//! `Nearest` (edge replication) and Sobel uses `Reflect`.

use ndarray::{ArrayD, ArrayViewD, Axis, Zip};

/// Gaussian kernels extend to `TRUNCATE * sigma` on each side.
const TRUNCATE: f32 = 4.0;

/// Sobel derivative and smoothing taps.
const SOBEL_EDGE: [f32; 3] = [1.0, 0.0, -1.0];
const SOBEL_SMOOTH: [f32; 3] = [0.25, 0.5, 0.25];

/// How indices outside `[0, n)` are mapped back into the array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryMode {
    /// Replicate the edge sample (`a a a | a b c d | d d d`).
    Nearest,
    /// Mirror including the edge sample (`c b a | a b c d | d c b`).
    Reflect,
}

impl BoundaryMode {
    #[inline]
    fn resolve(self, index: isize, len: usize) -> usize {
        let n = len as isize;
        match self {
            BoundaryMode::Nearest => index.clamp(0, n - 1) as usize,
            BoundaryMode::Reflect => {
                let period = 2 * n;
                let wrapped = index.rem_euclid(period);
                if wrapped >= n {
                    (period - wrapped - 1) as usize
                } else {
                    wrapped as usize
                }
            }
        }
    }
}

/// Correlates every lane along `axis` with `weights` centered at `len / 2`.
///
/// `out[i] = sum_k weights[k] * in[i + k - len / 2]`.
pub fn correlate1d(
    input: ArrayViewD<'_, f32>,
    weights: &[f32],
    axis: usize,
    mode: BoundaryMode,
) -> ArrayD<f32> {
    let mut output = ArrayD::<f32>::zeros(input.raw_dim());
    let len = input.len_of(Axis(axis));
    if len == 0 || weights.is_empty() {
        return output;
    }
    let half = (weights.len() / 2) as isize;
    Zip::from(output.lanes_mut(Axis(axis)))
        .and(input.lanes(Axis(axis)))
        .for_each(|mut dst, src| {
            for (i, out) in dst.iter_mut().enumerate() {
                let mut acc = 0.0f32;
                for (k, &w) in weights.iter().enumerate() {
                    let j = mode.resolve(i as isize + k as isize - half, len);
                    acc += w * src[j];
                }
                *out = acc;
            }
        });
    output
}

/// Normalized Gaussian taps for `sigma`, radius `floor(4 * sigma + 0.5)`.
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (TRUNCATE * sigma + 0.5) as isize;
    let denom = 2.0 * sigma * sigma;
    let mut taps: Vec<f32> = (-radius..=radius)
        .map(|x| (-((x * x) as f32) / denom).exp())
        .collect();
    let sum: f32 = taps.iter().sum();
    for tap in taps.iter_mut() {
        *tap /= sum;
    }
    taps
}

/// Isotropic Gaussian smoothing with edge replication.
///
/// Non-positive or vanishing sigmas return an unfiltered copy.
pub fn gaussian_filter(input: ArrayViewD<'_, f32>, sigma: f32) -> ArrayD<f32> {
    if sigma.is_nan() || sigma <= 1e-15 {
        return input.to_owned();
    }
    let taps = gaussian_kernel(sigma);
    let mut current = input.to_owned();
    for axis in 0..input.ndim() {
        current = correlate1d(current.view(), &taps, axis, BoundaryMode::Nearest);
    }
    current
}

/// Sobel gradient magnitude, `sqrt(sum_axis edge_axis^2 / ndim)`.
///
/// `edge_axis` differentiates along one axis and smooths with `[1, 2, 1] / 4`
/// along all others.
pub fn sobel_magnitude(input: ArrayViewD<'_, f32>) -> ArrayD<f32> {
    let ndim = input.ndim();
    let mut sum_sq = ArrayD::<f32>::zeros(input.raw_dim());
    if ndim == 0 {
        return sum_sq;
    }
    for axis in 0..ndim {
        let mut edge = correlate1d(input.view(), &SOBEL_EDGE, axis, BoundaryMode::Reflect);
        for other in (0..ndim).filter(|&other| other != axis) {
            edge = correlate1d(edge.view(), &SOBEL_SMOOTH, other, BoundaryMode::Reflect);
        }
        Zip::from(&mut sum_sq)
            .and(&edge)
            .for_each(|acc, &e| *acc += e * e);
    }
    let scale = 1.0 / ndim as f32;
    sum_sq.mapv_inplace(|v| (v * scale).sqrt());
    sum_sq
}
