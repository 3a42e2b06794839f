//! Multi-axis FFT pair built on `rustfft`.
//!
//! An n-D transform over a set of axes is a sequence of 1-D transforms, one
//! axis at a time, applied to every lane along that axis. Lanes are
//! independent, so with the `rayon` feature they can be processed in
//! parallel without changing the result.

use crate::backend::SpectralBackend;
use crate::util::{MaskCorrError, MaskCorrResult, Real};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMut1, Axis, IxDyn, Slice};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftDirection, FftPlanner, Length};
use std::sync::Arc;

/// Returns the smallest 7-smooth integer `>= n`.
///
/// Lengths whose prime factors are all in `{2, 3, 5, 7}` transform quickly
/// and stay much closer to `n` than the next power of two.
pub fn next_fast_len(n: usize) -> usize {
    if n <= 6 {
        return n;
    }
    let mut candidate = n;
    loop {
        if is_7_smooth(candidate) {
            return candidate;
        }
        candidate += 1;
    }
}

fn is_7_smooth(mut n: usize) -> bool {
    for p in [2, 3, 5, 7] {
        while n % p == 0 {
            n /= p;
        }
    }
    n == 1
}

/// Default spectral backend using `rustfft` plans on the CPU.
#[derive(Clone, Copy, Debug, Default)]
pub struct RustFftBackend {
    parallel: bool,
}

impl RustFftBackend {
    /// Creates a sequential backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables lane-parallel transforms when the `rayon` feature is on.
    ///
    /// Without the feature the flag is accepted and ignored.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl SpectralBackend for RustFftBackend {
    fn forward<F: Real>(
        &self,
        input: ArrayViewD<'_, F>,
        axes: &[usize],
        lengths: &[usize],
    ) -> MaskCorrResult<ArrayD<Complex<F>>> {
        if axes.len() != lengths.len() {
            return Err(MaskCorrError::Backend {
                reason: format!(
                    "{} transform axes but {} output lengths",
                    axes.len(),
                    lengths.len()
                ),
            });
        }
        let mut shape = input.shape().to_vec();
        for (&axis, &len) in axes.iter().zip(lengths) {
            if axis >= shape.len() {
                return Err(MaskCorrError::AxisOutOfBounds {
                    axis: axis as isize,
                    ndim: shape.len(),
                });
            }
            shape[axis] = len;
        }

        let mut spectrum = ArrayD::<Complex<F>>::zeros(IxDyn(&shape));
        let mut source = input;
        source.slice_each_axis_inplace(|desc| {
            Slice::from(0..desc.len.min(shape[desc.axis.index()]))
        });
        let mut target = spectrum.view_mut();
        target.slice_each_axis_inplace(|desc| Slice::from(0..source.len_of(desc.axis)));
        target.zip_mut_with(&source, |dst, &src| *dst = Complex::new(src, F::zero()));

        let mut planner = FftPlanner::<F>::new();
        for &axis in axes {
            let fft = plan(&mut planner, &spectrum, axis, FftDirection::Forward);
            transform_axis(&mut spectrum, axis, fft, self.parallel);
        }
        Ok(spectrum)
    }

    fn inverse<F: Real>(
        &self,
        mut spectrum: ArrayD<Complex<F>>,
        axes: &[usize],
    ) -> MaskCorrResult<ArrayD<Complex<F>>> {
        let mut planner = FftPlanner::<F>::new();
        let mut count = 1usize;
        for &axis in axes {
            if axis >= spectrum.ndim() {
                return Err(MaskCorrError::AxisOutOfBounds {
                    axis: axis as isize,
                    ndim: spectrum.ndim(),
                });
            }
            count *= spectrum.len_of(Axis(axis));
            let fft = plan(&mut planner, &spectrum, axis, FftDirection::Inverse);
            transform_axis(&mut spectrum, axis, fft, self.parallel);
        }
        if count > 1 {
            let scale = F::one() / F::cast(count as f64);
            spectrum.mapv_inplace(|v| v * scale);
        }
        Ok(spectrum)
    }

    fn next_fast_len(&self, n: usize) -> usize {
        next_fast_len(n)
    }
}

/// Plans the 1-D transform for lanes along `axis`; `None` for lengths `<= 1`.
fn plan<F: Real>(
    planner: &mut FftPlanner<F>,
    data: &ArrayD<Complex<F>>,
    axis: usize,
    direction: FftDirection,
) -> Option<Arc<dyn Fft<F>>> {
    let len = data.len_of(Axis(axis));
    (len > 1).then(|| planner.plan_fft(len, direction))
}

/// Lane copy and rustfft scratch, reused across lanes.
struct LaneBuffers<F> {
    lane: Vec<Complex<F>>,
    scratch: Vec<Complex<F>>,
}

impl<F: Real> LaneBuffers<F> {
    fn new(fft: &dyn Fft<F>) -> Self {
        let zero = Complex::new(F::zero(), F::zero());
        Self {
            lane: vec![zero; fft.len()],
            scratch: vec![zero; fft.get_inplace_scratch_len()],
        }
    }

    fn apply(&mut self, fft: &dyn Fft<F>, mut lane: ArrayViewMut1<'_, Complex<F>>) {
        if let Some(slice) = lane.as_slice_mut() {
            fft.process_with_scratch(slice, &mut self.scratch);
            return;
        }
        for (dst, src) in self.lane.iter_mut().zip(lane.iter()) {
            *dst = *src;
        }
        fft.process_with_scratch(&mut self.lane, &mut self.scratch);
        for (dst, src) in lane.iter_mut().zip(&self.lane) {
            *dst = *src;
        }
    }
}

/// Applies an unnormalized 1-D transform to every lane along `axis`.
///
/// Buffers are allocated once per pass, or once per worker when parallel.
fn transform_axis<F: Real>(
    data: &mut ArrayD<Complex<F>>,
    axis: usize,
    fft: Option<Arc<dyn Fft<F>>>,
    parallel: bool,
) {
    let Some(fft) = fft else {
        return;
    };
    let lanes = data.lanes_mut(Axis(axis)).into_iter();

    #[cfg(feature = "rayon")]
    {
        if parallel {
            lanes.collect::<Vec<_>>().into_par_iter().for_each_init(
                || LaneBuffers::new(fft.as_ref()),
                |buffers, lane| buffers.apply(fft.as_ref(), lane),
            );
            return;
        }
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;

    let mut buffers = LaneBuffers::new(fft.as_ref());
    for lane in lanes {
        buffers.apply(fft.as_ref(), lane);
    }
}
