use maskcorr::ndarray::{ArrayD, IxDyn};
use maskcorr::{
    cross_correlate_masked, CorrelationConfig, CorrelationMode, FeatureConfig, MaskCorrError,
    MaskedCorrelator, Precision,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex;

fn random_image(seed: u64, shape: &[usize]) -> ArrayD<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    ArrayD::from_shape_fn(IxDyn(shape), |_| rng.random::<f64>())
}

fn ones(shape: &[usize]) -> ArrayD<bool> {
    ArrayD::from_elem(IxDyn(shape), true)
}

#[test]
fn correlation_mode_parses_and_displays() {
    assert_eq!("full".parse::<CorrelationMode>().unwrap(), CorrelationMode::Full);
    assert_eq!("same".parse::<CorrelationMode>().unwrap(), CorrelationMode::Same);
    assert_eq!(
        "valid".parse::<CorrelationMode>().unwrap_err(),
        MaskCorrError::InvalidMode {
            mode: "valid".to_string()
        }
    );
    assert_eq!(CorrelationMode::Same.to_string(), "same");
    assert_eq!(CorrelationMode::default(), CorrelationMode::Full);
}

#[test]
fn config_defaults_and_validation() {
    let cfg = CorrelationConfig::default();
    assert_eq!(cfg.mode, CorrelationMode::Full);
    assert_eq!(cfg.axes, vec![-2, -1]);
    assert_eq!(cfg.overlap_ratio, 0.3);
    assert!(cfg.validate().is_ok());

    for ratio in [-0.1, f64::NAN, f64::INFINITY] {
        let bad = CorrelationConfig {
            overlap_ratio: ratio,
            ..CorrelationConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(MaskCorrError::InvalidConfiguration { .. })
        ));
    }

    let features = FeatureConfig::default();
    assert!(features.intensity && features.edges && features.texture);
    assert_eq!((features.sigma_min, features.sigma_max), (0.5, 16.0));
    assert_eq!(features.scales().unwrap().len(), 6);
    assert_eq!(features.features_per_scale(3), 5);
}

#[test]
fn error_messages_name_the_problem() {
    let err = MaskCorrError::InvalidMode {
        mode: "valid".to_string(),
    };
    assert_eq!(err.to_string(), "correlation mode 'valid' is not valid");

    let err = MaskCorrError::AxisOutOfBounds { axis: -3, ndim: 2 };
    assert!(err.to_string().contains("-3"));
}

#[test]
fn precision_promotes_to_the_wider_input() {
    assert_eq!(
        Precision::of::<u8>().promote(Precision::of::<f32>()),
        Precision::Single
    );
    assert_eq!(
        Precision::of::<u8>().promote(Precision::of::<i32>()),
        Precision::Double
    );
}

#[test]
fn rejects_complex_inputs_before_shape_checks() {
    let complex = ArrayD::from_elem(IxDyn(&[4, 4]), Complex::new(1.0f64, 2.0));
    let real = random_image(1, &[3, 3]);
    let err = cross_correlate_masked(
        complex.view(),
        real.view(),
        ones(&[4, 4]).view(),
        ones(&[5, 5]).view(),
        CorrelationMode::Full,
        &[-2, -1],
        0.3,
    )
    .unwrap_err();
    assert!(matches!(err, MaskCorrError::UnsupportedDtype { .. }));
}

#[test]
fn rejects_bad_axes_and_shapes() {
    let a = random_image(2, &[4, 6]);
    let b = random_image(3, &[5, 6]);
    let run = |axes: &[isize], m1: &ArrayD<bool>, m2: &ArrayD<bool>| {
        cross_correlate_masked(
            a.view(),
            b.view(),
            m1.view(),
            m2.view(),
            CorrelationMode::Full,
            axes,
            0.3,
        )
    };
    let m_a = ones(&[4, 6]);
    let m_b = ones(&[5, 6]);

    assert_eq!(
        run(&[2], &m_a, &m_b).unwrap_err(),
        MaskCorrError::AxisOutOfBounds { axis: 2, ndim: 2 }
    );
    assert_eq!(
        run(&[0, -2], &m_a, &m_b).unwrap_err(),
        MaskCorrError::DuplicateAxis { axis: 0 }
    );
    // Axis 0 differs but is not transformed.
    assert!(matches!(
        run(&[1], &m_a, &m_b),
        Err(MaskCorrError::ShapeMismatch { .. })
    ));
    assert!(matches!(
        run(&[0, 1], &m_b, &m_b),
        Err(MaskCorrError::ShapeMismatch { .. })
    ));
    assert!(matches!(
        run(&[0, 1], &m_a, &m_a),
        Err(MaskCorrError::ShapeMismatch { .. })
    ));
    assert!(run(&[0, 1], &m_a, &m_b).is_ok());

    let flat = random_image(4, &[4]);
    let err = cross_correlate_masked(
        a.view(),
        flat.view(),
        m_a.view(),
        ones(&[4]).view(),
        CorrelationMode::Full,
        &[0],
        0.3,
    )
    .unwrap_err();
    assert!(matches!(err, MaskCorrError::ShapeMismatch { .. }));
}

#[test]
fn identical_images_peak_at_zero_offset() {
    let image = random_image(5, &[16, 12]);
    let mut rng = StdRng::seed_from_u64(6);
    let mask = ArrayD::from_shape_fn(IxDyn(&[16, 12]), |_| rng.random_bool(0.9));

    let result = MaskedCorrelator::new()
        .correlate(image.view(), image.view(), mask.view(), mask.view())
        .unwrap();
    let surface = &result.surface;
    assert_eq!(surface.shape(), &[31, 23]);
    let center = surface[[15, 11]];
    assert!((center - 1.0).abs() < 1e-9, "center {center}");
    assert!(surface.iter().all(|v| (-1.0..=1.0).contains(v)));
    assert!(surface
        .indexed_iter()
        .all(|(ix, &v)| (ix[0] == 15 && ix[1] == 11) || v < center));

    let max_overlap = result.overlap.iter().copied().fold(0.0, f64::max);
    let valid = mask.iter().filter(|m| **m).count() as f64;
    assert_eq!(max_overlap, valid);
    assert!(result.overlap.iter().all(|&v| v >= f64::EPSILON));
}

#[test]
fn unmasked_identical_images_reach_one_at_zero_lag() {
    let image = random_image(10, &[13, 10]);
    let mask = ones(&[13, 10]);
    let surface = cross_correlate_masked(
        image.view(),
        image.view(),
        mask.view(),
        mask.view(),
        CorrelationMode::Full,
        &[-2, -1],
        0.0,
    )
    .unwrap();
    assert_eq!(surface.shape(), &[25, 19]);
    let center = surface[[12, 9]];
    assert!((center - 1.0).abs() < 1e-9, "center {center}");
}

#[test]
fn nan_pixels_are_not_clipped_to_anticorrelation() {
    let mut a = random_image(11, &[8, 8]);
    a[[3, 4]] = f64::NAN;
    let b = random_image(12, &[8, 8]);
    let surface = cross_correlate_masked(
        a.view(),
        b.view(),
        ones(&[8, 8]).view(),
        ones(&[8, 8]).view(),
        CorrelationMode::Full,
        &[-2, -1],
        0.3,
    )
    .unwrap();
    assert!(surface.iter().any(|v| v.is_nan()));
    assert!(surface.iter().all(|&v| v != -1.0));
}

#[test]
fn correlation_is_repeatable() {
    let a = random_image(7, &[9, 9]);
    let b = random_image(8, &[7, 11]);
    let run = || {
        cross_correlate_masked(
            a.view(),
            b.view(),
            ones(&[9, 9]).view(),
            ones(&[7, 11]).view(),
            CorrelationMode::Same,
            &[-2, -1],
            0.3,
        )
        .unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn constant_regions_yield_zero_not_nan() {
    let flat = ArrayD::from_elem(IxDyn(&[8, 8]), 3.0f64);
    let textured = random_image(9, &[8, 8]);
    let surface = cross_correlate_masked(
        flat.view(),
        textured.view(),
        ones(&[8, 8]).view(),
        ones(&[8, 8]).view(),
        CorrelationMode::Full,
        &[-2, -1],
        0.3,
    )
    .unwrap();
    assert!(surface.iter().all(|v| v.is_finite()));
    assert!(surface.iter().all(|v| v.abs() < 1e-3));

    let empty_mask = ArrayD::from_elem(IxDyn(&[8, 8]), false);
    let surface = cross_correlate_masked(
        textured.view(),
        textured.view(),
        empty_mask.view(),
        ones(&[8, 8]).view(),
        CorrelationMode::Full,
        &[-2, -1],
        0.3,
    )
    .unwrap();
    assert!(surface.iter().all(|&v| v == 0.0));
}
