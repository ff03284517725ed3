//! Edge case and numerical property tests for the DMD engine.

use approx::assert_abs_diff_eq;
use exodus_dmd::*;

/// Rotation by `theta` per step, embedded into `n_vars` dimensions.
fn embedded_rotation(n_vars: usize, n_time: usize, theta: f64) -> faer::Mat<f64> {
    let mut data = faer::Mat::<f64>::zeros(n_vars, n_time);
    for j in 0..n_time {
        let (s, c) = (theta * j as f64).sin_cos();
        for i in 0..n_vars {
            let a = 1.0 + 0.3 * i as f64;
            let b = (i as f64 * 1.7).cos();
            data[(i, j)] = a * c + b * s;
        }
    }
    data
}

/// Block-diagonal 3-state system: damped rotation ⊕ pure decay.
fn damped_system(n_time: usize) -> (faer::Mat<f64>, [f64; 3]) {
    let (rho, theta, mu): (f64, f64, f64) = (0.95, 0.3, 0.9);
    let mut data = faer::Mat::<f64>::zeros(3, n_time);
    let mut x = [1.0, 0.5, 1.0];
    for j in 0..n_time {
        for i in 0..3 {
            data[(i, j)] = x[i];
        }
        let (s, c) = theta.sin_cos();
        x = [
            rho * (c * x[0] - s * x[1]),
            rho * (s * x[0] + c * x[1]),
            mu * x[2],
        ];
    }
    (data, [rho, theta, mu])
}

// ============================================================================
// Known spectra
// ============================================================================

#[test]
fn embedded_rotation_eigenvalues() {
    let theta = 0.4;
    let data = embedded_rotation(6, 30, theta);
    let result = compute_dmd(&data, &DmdConfig::with_rank(2)).unwrap();

    assert_eq!(result.eigenvalues.len(), 2);
    assert_eq!(result.modes.len(), 6);
    for eig in &result.eigenvalues {
        assert_abs_diff_eq!(eig.norm(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eig.arg().abs(), theta, epsilon = 1e-9);
    }
}

#[test]
fn embedded_rotation_one_step_reconstruction() {
    let data = embedded_rotation(6, 30, 0.4);
    let result = compute_dmd(&data, &DmdConfig::with_rank(2)).unwrap();
    let err = one_step_error(&result, &data).unwrap();
    assert!(err < 1e-9, "one-step relative error {err}");
}

#[test]
fn full_rank_damped_system() {
    let (data, [rho, theta, mu]) = damped_system(40);
    let result = compute_dmd(&data, &DmdConfig::default()).unwrap();
    assert_eq!(result.rank, 3);

    // Descending magnitude: the rotation pair (ρ) before the decay (μ)
    let eigs = &result.eigenvalues;
    assert_abs_diff_eq!(eigs[0].norm(), rho, epsilon = 1e-9);
    assert_abs_diff_eq!(eigs[0].arg(), theta, epsilon = 1e-9);
    assert_abs_diff_eq!(eigs[1].norm(), rho, epsilon = 1e-9);
    assert_abs_diff_eq!(eigs[1].arg(), -theta, epsilon = 1e-9);
    assert_abs_diff_eq!(eigs[2].re, mu, epsilon = 1e-9);
    assert_abs_diff_eq!(eigs[2].im, 0.0, epsilon = 1e-9);

    let err = one_step_error(&result, &data).unwrap();
    assert!(err < 1e-9, "one-step relative error {err}");
}

#[test]
fn solver_order_keeps_pairing() {
    // The propagator is real, so advancing Re(φⱼ) must give Re(λⱼ φⱼ)
    // whatever order the eigensolver reports.
    let (data, _) = damped_system(40);
    for order in [EigenOrder::Solver, EigenOrder::Magnitude] {
        let config = DmdConfig {
            order,
            ..Default::default()
        };
        let result = compute_dmd(&data, &config).unwrap();
        for j in 0..result.rank {
            let phi = result.mode(j);
            let re_phi: Vec<f64> = phi.iter().map(|z| z.re).collect();
            let advanced = advance_snapshot(&result, &re_phi).unwrap();
            for (a, p) in advanced.iter().zip(&phi) {
                let expected = (result.eigenvalues[j] * *p).re;
                assert_abs_diff_eq!(*a, expected, epsilon = 1e-10);
            }
        }
    }
}

// ============================================================================
// Rank handling
// ============================================================================

#[test]
fn rank_zero_rejected() {
    let data = embedded_rotation(4, 20, 0.2);
    let err = compute_dmd(&data, &DmdConfig::with_rank(0)).unwrap_err();
    assert!(matches!(err, DmdError::InvalidInput(_)));
}

#[test]
fn rank_capped() {
    let (data, _) = damped_system(40);
    let result = compute_dmd(&data, &DmdConfig::with_rank(100)).unwrap();
    assert_eq!(result.rank, 3);
    assert_eq!(result.eigenvalues.len(), 3);
    assert!(result.was_clamped());
}

#[test]
fn rank_capped_by_snapshots() {
    // Wide matrix: k = n_time - 1
    let data = embedded_rotation(10, 3, 0.5);
    let result = compute_dmd(&data, &DmdConfig::with_rank(8)).unwrap();
    assert_eq!(result.rank, 2);
}

#[test]
fn rank_beyond_signal_is_numerical_error() {
    let data = embedded_rotation(6, 30, 0.4);
    let err = compute_dmd(&data, &DmdConfig::with_rank(3)).unwrap_err();
    assert!(matches!(err, DmdError::NumericalError(_)));
}

#[test]
fn looser_tolerance_accepts_tiny_singular_values() {
    let mut data = embedded_rotation(3, 20, 0.4);
    // Third direction carries a very small but genuine signal
    for j in 0..20 {
        data[(2, j)] += 1e-7 * (0.9_f64).powi(j as i32);
    }
    let strict = DmdConfig {
        singular_tol: 1e-6,
        ..Default::default()
    };
    assert!(compute_dmd(&data, &strict).is_err());
    assert!(compute_dmd(&data, &DmdConfig::default()).is_ok());
}

// ============================================================================
// Determinism and input validation
// ============================================================================

#[test]
fn repeated_calls_identical() {
    let (data, _) = damped_system(25);
    let a = compute_dmd(&data, &DmdConfig::default()).unwrap();
    let b = compute_dmd(&data, &DmdConfig::default()).unwrap();
    assert_eq!(a.eigenvalues, b.eigenvalues);
    assert_eq!(a.modes, b.modes);
    assert_eq!(a.svd.s, b.svd.s);
}

#[test]
fn nan_input_rejected() {
    let mut data = embedded_rotation(3, 10, 0.3);
    data[(1, 4)] = f64::NAN;
    assert!(matches!(
        compute_dmd(&data, &DmdConfig::default()),
        Err(DmdError::InvalidInput(_))
    ));
}

#[test]
fn minimum_size() {
    // Two snapshots: X1 and X2 are single columns
    let mut data = faer::Mat::<f64>::zeros(2, 2);
    data[(0, 0)] = 1.0;
    data[(1, 0)] = 0.0;
    data[(0, 1)] = 0.5;
    data[(1, 1)] = 0.5;

    let result = compute_dmd(&data, &DmdConfig::default()).unwrap();
    assert_eq!(result.rank, 1);
    // Ã = uᵀ x₂ / s with u = e₀, s = 1
    assert_abs_diff_eq!(result.eigenvalues[0].re, 0.5, epsilon = 1e-12);
}
