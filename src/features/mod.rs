//! Multiscale local features for pixel classification.
//!
//! For every channel and every Gaussian scale the extractor produces the
//! blurred intensity, its Sobel gradient magnitude and the eigenvalues of its
//! Hessian. Features are stacked along a new trailing axis in the order
//! channel, scale, then intensity / edges / eigenvalues.

use crate::array::{DtypeKind, Element};
use crate::backend::{CpuBackend, FeatureBackend};
use crate::trace::{trace_event, trace_span};
use crate::util::{MaskCorrError, MaskCorrResult};
use ndarray::{ArrayD, ArrayViewD, Axis};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

mod scales;
pub mod texture;

pub use scales::ScaleSet;

/// Feature selection and scale range.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeatureConfig {
    /// Emit the blurred intensity at every scale.
    pub intensity: bool,
    /// Emit the Sobel magnitude of the blurred image.
    pub edges: bool,
    /// Emit the Hessian eigenvalues of the blurred image.
    pub texture: bool,
    /// Smallest Gaussian sigma.
    pub sigma_min: f32,
    /// Largest Gaussian sigma.
    pub sigma_max: f32,
    /// Number of scales; one per octave when `None`.
    pub num_sigma: Option<usize>,
    /// Run (channel, scale) jobs on the rayon pool (`rayon` feature).
    pub parallel: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            intensity: true,
            edges: true,
            texture: true,
            sigma_min: 0.5,
            sigma_max: 16.0,
            num_sigma: None,
            parallel: false,
        }
    }
}

impl FeatureConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> MaskCorrResult<()> {
        if !(self.intensity || self.edges || self.texture) {
            return Err(MaskCorrError::InvalidConfiguration {
                reason: "at least one of intensity, edges or texture must be enabled",
            });
        }
        self.scales().map(|_| ())
    }

    /// Scale set described by `sigma_min`, `sigma_max` and `num_sigma`.
    pub fn scales(&self) -> MaskCorrResult<ScaleSet> {
        ScaleSet::geometric(self.sigma_min, self.sigma_max, self.num_sigma)
    }

    /// Number of features emitted per channel and scale for `spatial_ndim`.
    pub fn features_per_scale(&self, spatial_ndim: usize) -> usize {
        usize::from(self.intensity)
            + usize::from(self.edges)
            + if self.texture { spatial_ndim } else { 0 }
    }
}

/// Multiscale feature extractor over a pluggable filtering backend.
#[derive(Clone, Debug)]
pub struct FeatureExtractor<B = CpuBackend> {
    cfg: FeatureConfig,
    backend: B,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    /// Creates an extractor with the default configuration and CPU backend.
    pub fn new() -> Self {
        Self {
            cfg: FeatureConfig::default(),
            backend: CpuBackend,
        }
    }
}

impl<B: FeatureBackend> FeatureExtractor<B> {
    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: FeatureConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Replaces the filtering backend.
    pub fn with_backend<C: FeatureBackend>(self, backend: C) -> FeatureExtractor<C> {
        FeatureExtractor {
            cfg: self.cfg,
            backend,
        }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }

    /// Computes the feature stack with the configured scale range.
    ///
    /// Returns an array of shape `spatial_shape + (n_features,)`. With
    /// `multichannel` the last axis of `image` holds channels; it is ignored
    /// for images with fewer than three axes.
    pub fn compute<T: Element>(
        &self,
        image: ArrayViewD<'_, T>,
        multichannel: bool,
    ) -> MaskCorrResult<ArrayD<f32>> {
        self.cfg.validate()?;
        let scales = self.cfg.scales()?;
        self.compute_with_scales(image, multichannel, &scales)
    }

    /// Computes the feature stack for an explicit scale set.
    pub fn compute_with_scales<T: Element>(
        &self,
        image: ArrayViewD<'_, T>,
        multichannel: bool,
        scales: &ScaleSet,
    ) -> MaskCorrResult<ArrayD<f32>> {
        if !(self.cfg.intensity || self.cfg.edges || self.cfg.texture) {
            return Err(MaskCorrError::InvalidConfiguration {
                reason: "at least one of intensity, edges or texture must be enabled",
            });
        }
        if T::KIND == DtypeKind::Complex {
            return Err(MaskCorrError::UnsupportedDtype {
                reason: "feature extraction requires real-valued images",
            });
        }
        if image.ndim() == 0 {
            return Err(MaskCorrError::InvalidShape {
                reason: "image must have at least one axis".to_string(),
            });
        }

        let multichannel = multichannel && image.ndim() >= 3;
        let channels: Vec<ArrayD<f32>> = if multichannel {
            let last = Axis(image.ndim() - 1);
            image
                .axis_iter(last)
                .map(|channel| channel.mapv(T::to_unit_f32))
                .collect()
        } else {
            vec![image.mapv(T::to_unit_f32)]
        };
        let Some(spatial_ndim) = channels.first().map(|c| c.ndim()) else {
            return Err(MaskCorrError::InvalidShape {
                reason: "multichannel image has no channels".to_string(),
            });
        };

        let _span = trace_span!(
            "multiscale_features",
            channels = channels.len(),
            scales = scales.len(),
            ndim = spatial_ndim
        )
        .entered();

        let jobs: Vec<(usize, f32)> = (0..channels.len())
            .flat_map(|c| scales.iter().map(move |sigma| (c, sigma)))
            .collect();
        let run = |&(c, sigma): &(usize, f32)| self.features_at_scale(channels[c].view(), sigma);

        let per_job: Vec<Vec<ArrayD<f32>>> = self.run_jobs(&jobs, run)?;

        let views: Vec<ArrayViewD<'_, f32>> = per_job.iter().flatten().map(|f| f.view()).collect();
        trace_event!("features_stacked", count = views.len());
        Ok(ndarray::stack(Axis(spatial_ndim), &views)?)
    }

    #[cfg(feature = "rayon")]
    fn run_jobs<J, R>(&self, jobs: &[J], run: R) -> MaskCorrResult<Vec<Vec<ArrayD<f32>>>>
    where
        J: Sync,
        R: Fn(&J) -> MaskCorrResult<Vec<ArrayD<f32>>> + Send + Sync,
    {
        if self.cfg.parallel {
            jobs.par_iter().map(run).collect()
        } else {
            jobs.iter().map(run).collect()
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn run_jobs<J, R>(&self, jobs: &[J], run: R) -> MaskCorrResult<Vec<Vec<ArrayD<f32>>>>
    where
        R: Fn(&J) -> MaskCorrResult<Vec<ArrayD<f32>>>,
    {
        jobs.iter().map(run).collect()
    }

    fn features_at_scale(
        &self,
        channel: ArrayViewD<'_, f32>,
        sigma: f32,
    ) -> MaskCorrResult<Vec<ArrayD<f32>>> {
        let ndim = channel.ndim();
        let blurred = self.backend.gaussian(channel, sigma)?;
        let edges = if self.cfg.edges {
            Some(self.backend.sobel(blurred.view())?)
        } else {
            None
        };
        let eigenvalues = if self.cfg.texture {
            let elements = texture::hessian_elements(blurred.view())?;
            let eigenvalues = self.backend.hessian_eigenvalues(&elements)?;
            if eigenvalues.len() != ndim {
                return Err(MaskCorrError::Backend {
                    reason: format!(
                        "expected {} Hessian eigenvalues, backend returned {}",
                        ndim,
                        eigenvalues.len()
                    ),
                });
            }
            eigenvalues
        } else {
            Vec::new()
        };

        let mut out = Vec::with_capacity(self.cfg.features_per_scale(ndim));
        if self.cfg.intensity {
            out.push(blurred);
        }
        out.extend(edges);
        out.extend(eigenvalues);
        Ok(out)
    }
}

/// Computes multiscale features with the default CPU backend.
pub fn multiscale_basic_features<T: Element>(
    image: ArrayViewD<'_, T>,
    multichannel: bool,
    cfg: &FeatureConfig,
) -> MaskCorrResult<ArrayD<f32>> {
    FeatureExtractor::new()
        .with_config(cfg.clone())
        .compute(image, multichannel)
}
