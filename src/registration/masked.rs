use crate::array::{
    centered, ensure_same_shape, flip_axes, leading, max_over_axes, normalize_axes, DtypeKind,
    Element, MaskValue, Precision,
};
use crate::backend::{RustFftBackend, SpectralBackend};
use crate::registration::{CorrelationConfig, CorrelationMode};
use crate::trace::{trace_event, trace_span};
use crate::util::{MaskCorrError, MaskCorrResult, Real};
use ndarray::{ArrayD, ArrayViewD, Axis, Zip};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Float;

/// Output of [`MaskedCorrelator::correlate`].
#[derive(Clone, Debug, PartialEq)]
pub struct MaskedCorrelation {
    /// Normalized correlation in `[-1, 1]`; zero where the overlap is too
    /// small or the local variance vanishes.
    pub surface: ArrayD<f64>,
    /// Number of co-valid pixels per translation, at least machine epsilon.
    pub overlap: ArrayD<f64>,
}

/// Masked normalized cross-correlation engine.
#[derive(Clone, Debug, Default)]
pub struct MaskedCorrelator<S = RustFftBackend> {
    cfg: CorrelationConfig,
    backend: S,
}

impl MaskedCorrelator {
    /// Creates a correlator with the default configuration and FFT backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SpectralBackend> MaskedCorrelator<S> {
    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: CorrelationConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Replaces the spectral backend.
    pub fn with_backend<T: SpectralBackend>(self, backend: T) -> MaskedCorrelator<T> {
        MaskedCorrelator {
            cfg: self.cfg,
            backend,
        }
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.cfg
    }

    /// Correlates `arr1` (fixed) with `arr2` (moving) under their masks.
    ///
    /// Computation runs in single precision unless either input needs double
    /// (wide integers or `f64`); results are widened to `f64`.
    pub fn correlate<A, B, M1, M2>(
        &self,
        arr1: ArrayViewD<'_, A>,
        arr2: ArrayViewD<'_, B>,
        m1: ArrayViewD<'_, M1>,
        m2: ArrayViewD<'_, M2>,
    ) -> MaskCorrResult<MaskedCorrelation>
    where
        A: Element,
        B: Element,
        M1: MaskValue,
        M2: MaskValue,
    {
        if A::KIND == DtypeKind::Complex || B::KIND == DtypeKind::Complex {
            return Err(MaskCorrError::UnsupportedDtype {
                reason: "complex-valued arr1, arr2 are not supported",
            });
        }
        self.cfg.validate()?;
        let axes = normalize_axes(&self.cfg.axes, arr1.ndim())?;
        if arr1.ndim() != arr2.ndim() {
            return Err(MaskCorrError::ShapeMismatch {
                context: "array rank",
                expected: arr1.shape().to_vec(),
                got: arr2.shape().to_vec(),
            });
        }
        for axis in (0..arr1.ndim()).filter(|axis| !axes.contains(axis)) {
            if arr1.len_of(Axis(axis)) != arr2.len_of(Axis(axis)) {
                return Err(MaskCorrError::ShapeMismatch {
                    context: "non-transformed axes",
                    expected: arr1.shape().to_vec(),
                    got: arr2.shape().to_vec(),
                });
            }
        }
        ensure_same_shape("arr1 vs m1", arr1.shape(), m1.shape())?;
        ensure_same_shape("arr2 vs m2", arr2.shape(), m2.shape())?;
        for &axis in &axes {
            for len in [arr1.len_of(Axis(axis)), arr2.len_of(Axis(axis))] {
                if len == 0 {
                    return Err(MaskCorrError::ArrayTooSmall { axis, len, min: 1 });
                }
            }
        }

        let _span = trace_span!(
            "cross_correlate_masked",
            mode = self.cfg.mode.as_str(),
            ndim = arr1.ndim(),
            axes = axes.len()
        )
        .entered();

        match Precision::of::<A>().promote(Precision::of::<B>()) {
            Precision::Single => self.correlate_in::<f32, _, _, _, _>(arr1, arr2, m1, m2, &axes),
            Precision::Double => self.correlate_in::<f64, _, _, _, _>(arr1, arr2, m1, m2, &axes),
        }
    }

    fn correlate_in<F, A, B, M1, M2>(
        &self,
        arr1: ArrayViewD<'_, A>,
        arr2: ArrayViewD<'_, B>,
        m1: ArrayViewD<'_, M1>,
        m2: ArrayViewD<'_, M2>,
        axes: &[usize],
    ) -> MaskCorrResult<MaskedCorrelation>
    where
        F: Real,
        A: Element,
        B: Element,
        M1: MaskValue,
        M2: MaskValue,
    {
        let eps = F::epsilon();
        let mut final_shape = arr1.shape().to_vec();
        for &axis in axes {
            final_shape[axis] = arr1.len_of(Axis(axis)) + arr2.len_of(Axis(axis)) - 1;
        }
        let fast_lengths: Vec<usize> = axes
            .iter()
            .map(|&axis| self.backend.next_fast_len(final_shape[axis]))
            .collect();
        trace_event!(
            "fft_plan",
            transform_len = fast_lengths.iter().product::<usize>(),
            output_len = final_shape.iter().product::<usize>()
        );

        let fixed = masked_copy::<F, _, _>(arr1.view(), m1.view());
        let moving = masked_copy::<F, _, _>(arr2, m2.view());
        let fixed_mask = m1.mapv(indicator::<F, M1>);
        let moving_mask = m2.mapv(indicator::<F, M2>);
        let rotated_moving = flip_axes(moving.view(), axes);
        let rotated_moving_mask = flip_axes(moving_mask.view(), axes);

        let fft = |input: ArrayViewD<'_, F>| self.backend.forward(input, axes, &fast_lengths);
        let product_ifft = |a: &ArrayD<Complex<F>>, b: &ArrayD<Complex<F>>| {
            self.backend
                .inverse(a * b, axes)
                .map(|spectrum| spectrum.mapv(|c| c.re))
        };

        let fixed_fft = fft(fixed.view())?;
        let rotated_moving_fft = fft(rotated_moving.view())?;
        let fixed_mask_fft = fft(fixed_mask.view())?;
        let rotated_moving_mask_fft = fft(rotated_moving_mask.view())?;

        let mut overlap = product_ifft(&rotated_moving_mask_fft, &fixed_mask_fft)?;
        overlap.mapv_inplace(|v| v.round().max(eps));

        let masked_fixed = product_ifft(&rotated_moving_mask_fft, &fixed_fft)?;
        let masked_moving = product_ifft(&fixed_mask_fft, &rotated_moving_fft)?;

        let mut numerator = product_ifft(&rotated_moving_fft, &fixed_fft)?;
        Zip::from(&mut numerator)
            .and(&masked_fixed)
            .and(&masked_moving)
            .and(&overlap)
            .for_each(|n, &f, &m, &o| *n = *n - f * m / o);
        drop(rotated_moving_fft);

        let fixed_squared_fft = fft(fixed.mapv(|v| v * v).view())?;
        let mut fixed_denom = product_ifft(&rotated_moving_mask_fft, &fixed_squared_fft)?;
        Zip::from(&mut fixed_denom)
            .and(&masked_fixed)
            .and(&overlap)
            .for_each(|d, &f, &o| *d = (*d - f * f / o).max(F::zero()));
        drop(fixed_squared_fft);

        let rotated_moving_squared_fft = fft(rotated_moving.mapv(|v| v * v).view())?;
        let mut denom = product_ifft(&fixed_mask_fft, &rotated_moving_squared_fft)?;
        Zip::from(&mut denom)
            .and(&masked_moving)
            .and(&overlap)
            .and(&fixed_denom)
            .for_each(|d, &m, &o, &fd| {
                let moving_denom = (*d - m * m / o).max(F::zero());
                *d = (fd * moving_denom).sqrt();
            });

        let mut numerator = leading(numerator.view(), &final_shape);
        let mut denom = leading(denom.view(), &final_shape);
        let mut overlap = leading(overlap.view(), &final_shape);
        if self.cfg.mode == CorrelationMode::Same {
            numerator = centered(numerator, arr1.shape(), axes);
            denom = centered(denom, arr1.shape(), axes);
            overlap = centered(overlap, arr1.shape(), axes);
        }

        let tolerance =
            max_over_axes(denom.view(), axes, Float::abs).mapv(|m| m * eps * F::cast(1e3));
        let max_overlap = max_over_axes(overlap.view(), axes, |v| v);
        let ratio = F::cast(self.cfg.overlap_ratio);

        let surface = Zip::from(&numerator)
            .and(&denom)
            .and(&overlap)
            .and_broadcast(&tolerance)
            .and_broadcast(&max_overlap)
            .map_collect(|&n, &d, &o, &tol, &max_o| {
                if o < ratio * max_o || d <= tol {
                    0.0
                } else {
                    let r = n / d;
                    if r.is_nan() {
                        r.widen()
                    } else {
                        r.max(-F::one()).min(F::one()).widen()
                    }
                }
            });
        trace_event!(
            "correlation_surface",
            max_overlap = max_overlap.iter().fold(0.0f64, |acc, v| acc.max(v.widen()))
        );

        Ok(MaskedCorrelation {
            surface,
            overlap: overlap.mapv(Real::widen),
        })
    }
}

/// Copy of `image` in working precision with invalid pixels set to zero.
fn masked_copy<F: Real, T: Element, M: MaskValue>(
    image: ArrayViewD<'_, T>,
    mask: ArrayViewD<'_, M>,
) -> ArrayD<F> {
    Zip::from(image).and(mask).map_collect(|&v, &m| {
        if m.is_valid() {
            F::cast(v.to_f64())
        } else {
            F::zero()
        }
    })
}

#[inline]
fn indicator<F: Real, M: MaskValue>(m: M) -> F {
    if m.is_valid() {
        F::one()
    } else {
        F::zero()
    }
}

/// Masked normalized cross-correlation of `arr1` and `arr2` with the default
/// FFT backend.
///
/// `axes` may be negative. Returns the correlation surface only; use
/// [`MaskedCorrelator`] to also obtain the overlap counts.
pub fn cross_correlate_masked<A, B, M1, M2>(
    arr1: ArrayViewD<'_, A>,
    arr2: ArrayViewD<'_, B>,
    m1: ArrayViewD<'_, M1>,
    m2: ArrayViewD<'_, M2>,
    mode: CorrelationMode,
    axes: &[isize],
    overlap_ratio: f64,
) -> MaskCorrResult<ArrayD<f64>>
where
    A: Element,
    B: Element,
    M1: MaskValue,
    M2: MaskValue,
{
    let cfg = CorrelationConfig {
        mode,
        axes: axes.to_vec(),
        overlap_ratio,
    };
    MaskedCorrelator::new()
        .with_config(cfg)
        .correlate(arr1, arr2, m1, m2)
        .map(|result| result.surface)
}
