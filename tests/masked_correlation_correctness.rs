use maskcorr::ndarray::{s, Array2, ArrayD, Axis, Ix2, IxDyn};
use maskcorr::{cross_correlate_masked, CorrelationConfig, CorrelationMode, MaskedCorrelator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_image(rng: &mut StdRng, shape: &[usize]) -> ArrayD<f64> {
    ArrayD::from_shape_fn(IxDyn(shape), |_| rng.random::<f64>())
}

fn random_mask(rng: &mut StdRng, shape: &[usize], valid: f64) -> ArrayD<bool> {
    ArrayD::from_shape_fn(IxDyn(shape), |_| rng.random_bool(valid))
}

struct BruteForce {
    surface: Array2<f64>,
    overlap: Array2<f64>,
    denom: Array2<f64>,
}

/// Direct spatial evaluation of the masked NCC for every full-mode offset.
fn brute_force_full(
    fixed: &Array2<f64>,
    fixed_mask: &Array2<bool>,
    moving: &Array2<f64>,
    moving_mask: &Array2<bool>,
    overlap_ratio: f64,
) -> BruteForce {
    let (h1, w1) = fixed.dim();
    let (h2, w2) = moving.dim();
    let out_shape = (h1 + h2 - 1, w1 + w2 - 1);
    let mut numerator = Array2::<f64>::zeros(out_shape);
    let mut denom = Array2::<f64>::zeros(out_shape);
    let mut overlap = Array2::<f64>::zeros(out_shape);

    for cy in 0..out_shape.0 {
        for cx in 0..out_shape.1 {
            let dy = cy as isize - (h2 as isize - 1);
            let dx = cx as isize - (w2 as isize - 1);
            let (mut n, mut sf, mut sm) = (0.0f64, 0.0f64, 0.0f64);
            let (mut sff, mut smm, mut sfm) = (0.0f64, 0.0f64, 0.0f64);
            for y in 0..h1 {
                let qy = y as isize - dy;
                if qy < 0 || qy >= h2 as isize {
                    continue;
                }
                for x in 0..w1 {
                    let qx = x as isize - dx;
                    if qx < 0 || qx >= w2 as isize {
                        continue;
                    }
                    let q = [qy as usize, qx as usize];
                    if !fixed_mask[[y, x]] || !moving_mask[q] {
                        continue;
                    }
                    let a = fixed[[y, x]];
                    let b = moving[q];
                    n += 1.0;
                    sf += a;
                    sm += b;
                    sff += a * a;
                    smm += b * b;
                    sfm += a * b;
                }
            }
            let count = n.max(f64::EPSILON);
            let fixed_var = (sff - sf * sf / count).max(0.0);
            let moving_var = (smm - sm * sm / count).max(0.0);
            numerator[[cy, cx]] = sfm - sf * sm / count;
            denom[[cy, cx]] = (fixed_var * moving_var).sqrt();
            overlap[[cy, cx]] = count;
        }
    }

    let max_denom = denom.iter().copied().fold(0.0f64, f64::max);
    let max_overlap = overlap.iter().copied().fold(0.0f64, f64::max);
    let tol = 1e3 * f64::EPSILON * max_denom;
    let mut surface = Array2::<f64>::zeros(out_shape);
    for ((idx, value), (&num, &den)) in surface
        .indexed_iter_mut()
        .zip(numerator.iter().zip(denom.iter()))
    {
        if overlap[idx] < overlap_ratio * max_overlap || den <= tol {
            continue;
        }
        *value = (num / den).clamp(-1.0, 1.0);
    }
    BruteForce {
        surface,
        overlap,
        denom,
    }
}

fn as_2d<T: Clone>(array: &ArrayD<T>) -> Array2<T> {
    array.clone().into_dimensionality::<Ix2>().unwrap()
}

#[test]
fn full_mode_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(7);
    let fixed = random_image(&mut rng, &[12, 10]);
    let moving = random_image(&mut rng, &[9, 13]);
    let fixed_mask = random_mask(&mut rng, &[12, 10], 0.75);
    let moving_mask = random_mask(&mut rng, &[9, 13], 0.75);

    let result = MaskedCorrelator::new()
        .correlate(
            fixed.view(),
            moving.view(),
            fixed_mask.view(),
            moving_mask.view(),
        )
        .unwrap();
    assert_eq!(result.surface.shape(), &[20, 22]);

    let expected = brute_force_full(
        &as_2d(&fixed),
        &as_2d(&fixed_mask),
        &as_2d(&moving),
        &as_2d(&moving_mask),
        0.3,
    );
    let max_denom = expected.denom.iter().copied().fold(0.0f64, f64::max);
    let surface = as_2d(&result.surface);
    let overlap = as_2d(&result.overlap);
    let mut compared = 0;
    for ((idx, &got), &want) in surface.indexed_iter().zip(expected.surface.iter()) {
        assert!(
            (overlap[idx] - expected.overlap[idx]).abs() < 1e-9,
            "overlap at {idx:?}: {} vs {}",
            overlap[idx],
            expected.overlap[idx]
        );
        if expected.denom[idx] < 1e-6 * max_denom {
            continue;
        }
        assert!(
            (got - want).abs() < 1e-9,
            "surface at {idx:?}: {got} vs {want}"
        );
        compared += 1;
    }
    assert!(compared > 100);
}

#[test]
fn overlap_ratio_zero_keeps_small_overlaps() {
    let mut rng = StdRng::seed_from_u64(11);
    let fixed = random_image(&mut rng, &[8, 8]);
    let moving = random_image(&mut rng, &[8, 8]);
    let mask = ArrayD::from_elem(IxDyn(&[8, 8]), true);

    let strict = cross_correlate_masked(
        fixed.view(),
        moving.view(),
        mask.view(),
        mask.view(),
        CorrelationMode::Full,
        &[-2, -1],
        0.9,
    )
    .unwrap();
    let loose = cross_correlate_masked(
        fixed.view(),
        moving.view(),
        mask.view(),
        mask.view(),
        CorrelationMode::Full,
        &[-2, -1],
        0.0,
    )
    .unwrap();

    let strict_nonzero = strict.iter().filter(|v| **v != 0.0).count();
    let loose_nonzero = loose.iter().filter(|v| **v != 0.0).count();
    assert!(strict_nonzero < loose_nonzero);
    for (s, l) in strict.iter().zip(loose.iter()) {
        if *s != 0.0 {
            assert_eq!(s, l);
        }
    }
    // A full overlap (center offset) survives any ratio up to one.
    assert_ne!(strict[[7, 7]], 0.0);
}

#[test]
fn same_mode_is_centered_crop_of_full() {
    let mut rng = StdRng::seed_from_u64(3);
    let fixed = random_image(&mut rng, &[11, 9]);
    let moving = random_image(&mut rng, &[6, 8]);
    let fixed_mask = random_mask(&mut rng, &[11, 9], 0.8);
    let moving_mask = random_mask(&mut rng, &[6, 8], 0.8);

    let run = |mode| {
        cross_correlate_masked(
            fixed.view(),
            moving.view(),
            fixed_mask.view(),
            moving_mask.view(),
            mode,
            &[0, 1],
            0.3,
        )
        .unwrap()
    };
    let full = run(CorrelationMode::Full);
    let same = run(CorrelationMode::Same);
    assert_eq!(full.shape(), &[16, 16]);
    assert_eq!(same.shape(), &[11, 9]);

    // start = (16 - 11) / 2 = 2 and (16 - 9) / 2 = 3.
    let crop = full.slice(s![2..13, 3..12]);
    for (a, b) in same.iter().zip(crop.iter()) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn non_transformed_axes_are_independent_slices() {
    let mut rng = StdRng::seed_from_u64(21);
    let fixed = random_image(&mut rng, &[3, 10, 7]);
    let moving = random_image(&mut rng, &[3, 6, 9]);
    let fixed_mask = random_mask(&mut rng, &[3, 10, 7], 0.8);
    let moving_mask = random_mask(&mut rng, &[3, 6, 9], 0.8);

    let batched = MaskedCorrelator::new()
        .correlate(
            fixed.view(),
            moving.view(),
            fixed_mask.view(),
            moving_mask.view(),
        )
        .unwrap();
    assert_eq!(batched.surface.shape(), &[3, 15, 15]);

    let correlator = MaskedCorrelator::new().with_config(CorrelationConfig {
        axes: vec![0, 1],
        ..CorrelationConfig::default()
    });
    for k in 0..3 {
        let single = correlator
            .correlate(
                fixed.index_axis(Axis(0), k),
                moving.index_axis(Axis(0), k),
                fixed_mask.index_axis(Axis(0), k),
                moving_mask.index_axis(Axis(0), k),
            )
            .unwrap();
        let slice = batched.surface.index_axis(Axis(0), k);
        for (a, b) in slice.iter().zip(single.surface.iter()) {
            assert!((a - b).abs() < 1e-9, "slice {k}: {a} vs {b}");
        }
    }
}

#[test]
fn single_precision_tracks_double_precision() {
    let mut rng = StdRng::seed_from_u64(99);
    let bytes = ArrayD::from_shape_fn(IxDyn(&[14, 12]), |_| rng.random_range(0u8..=255));
    let other = ArrayD::from_shape_fn(IxDyn(&[10, 12]), |_| rng.random_range(0u8..=255));
    let m1 = random_mask(&mut rng, &[14, 12], 0.8);
    let m2 = random_mask(&mut rng, &[10, 12], 0.8);

    let single = cross_correlate_masked(
        bytes.view(),
        other.view(),
        m1.view(),
        m2.view(),
        CorrelationMode::Full,
        &[-2, -1],
        0.3,
    )
    .unwrap();
    let double = cross_correlate_masked(
        bytes.mapv(f64::from).view(),
        other.mapv(f64::from).view(),
        m1.view(),
        m2.view(),
        CorrelationMode::Full,
        &[-2, -1],
        0.3,
    )
    .unwrap();

    assert_eq!(single.shape(), double.shape());
    let max_diff = single
        .iter()
        .zip(double.iter())
        .filter(|(_, d)| **d != 0.0)
        .map(|(s, d)| (s - d).abs())
        .fold(0.0f64, f64::max);
    assert!(max_diff < 2e-3, "max diff {max_diff}");
}
