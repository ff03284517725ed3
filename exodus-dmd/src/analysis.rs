use faer::Mat;

use crate::types::{DmdError, DmdResult, ModeInfo, Stability, C64};
use crate::utils::complex_solve;

/// Classify eigenvalue stability.
fn classify_eigenvalue(magnitude: f64, tol: f64) -> Stability {
    if magnitude < 1.0 - tol {
        Stability::Decaying
    } else if magnitude > 1.0 + tol {
        Stability::Growing
    } else {
        Stability::Neutral
    }
}

/// Compute the eigenvalue spectrum with frequency and growth rate.
///
/// `dt` is the sampling interval of the snapshots.
pub fn dmd_spectrum(result: &DmdResult, dt: f64) -> Vec<ModeInfo> {
    eigenvalue_spectrum(&result.eigenvalues, dt)
}

/// Spectrum of a bare eigenvalue list, e.g. one read back from an archive.
pub fn eigenvalue_spectrum(eigenvalues: &[C64], dt: f64) -> Vec<ModeInfo> {
    eigenvalues
        .iter()
        .enumerate()
        .map(|(index, &lambda)| {
            let magnitude = lambda.norm();
            let phase = lambda.arg();
            ModeInfo {
                index,
                eigenvalue: lambda,
                magnitude,
                phase,
                frequency: phase.abs() / (2.0 * std::f64::consts::PI * dt),
                growth_rate: magnitude.ln() / dt,
                stability: classify_eigenvalue(magnitude, 1e-6),
            }
        })
        .collect()
}

/// Least-squares mode amplitudes b with Φ b ≈ x.
pub fn mode_amplitudes(result: &DmdResult, x: &[f64]) -> Result<Vec<C64>, DmdError> {
    let n_vars = result.n_vars();
    if x.len() != n_vars {
        return Err(DmdError::InvalidInput(format!(
            "state has length {}, expected {n_vars}",
            x.len()
        )));
    }
    let rank = result.rank;
    let modes = &result.modes;

    // Normal equations Φᴴ Φ b = Φᴴ x
    let mut gram = vec![vec![C64::zero(); rank]; rank];
    let mut rhs = vec![C64::zero(); rank];
    for i in 0..rank {
        for j in 0..rank {
            let mut val = C64::zero();
            for row in modes {
                val += row[i].conj() * row[j];
            }
            gram[i][j] = val;
        }
        let mut val = C64::zero();
        for (row, &xk) in modes.iter().zip(x) {
            val += row[i].conj() * xk;
        }
        rhs[i] = val;
    }

    complex_solve(&gram, &rhs)
}

/// Advance a state one step with the DMD propagator: Re(Φ Λ Φ⁺ x).
pub fn advance_snapshot(result: &DmdResult, x: &[f64]) -> Result<Vec<f64>, DmdError> {
    let b = mode_amplitudes(result, x)?;
    let scaled: Vec<C64> = b
        .iter()
        .zip(&result.eigenvalues)
        .map(|(&bj, &lj)| bj * lj)
        .collect();
    Ok(result
        .modes
        .iter()
        .map(|row| {
            let mut acc = C64::zero();
            for (&phi, &c) in row.iter().zip(&scaled) {
                acc += phi * c;
            }
            acc.re
        })
        .collect())
}

/// Relative Frobenius error of one-step predictions over the snapshot matrix.
///
/// Compares Re(Φ Λ Φ⁺ xₜ) with xₜ₊₁ for every consecutive pair.
pub fn one_step_error(result: &DmdResult, x: &Mat<f64>) -> Result<f64, DmdError> {
    if x.nrows() != result.n_vars() || x.ncols() < 2 {
        return Err(DmdError::InvalidInput(format!(
            "snapshot matrix is {}×{}, expected {} rows and at least 2 columns",
            x.nrows(),
            x.ncols(),
            result.n_vars()
        )));
    }
    let mut err_sq = 0.0;
    let mut ref_sq = 0.0;
    for t in 0..x.ncols() - 1 {
        let current: Vec<f64> = (0..x.nrows()).map(|i| x[(i, t)]).collect();
        let predicted = advance_snapshot(result, &current)?;
        for (i, p) in predicted.iter().enumerate() {
            let actual = x[(i, t + 1)];
            err_sq += (p - actual).powi(2);
            ref_sq += actual * actual;
        }
    }
    if ref_sq == 0.0 {
        return Ok(err_sq.sqrt());
    }
    Ok((err_sq / ref_sq).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmd::compute_dmd;
    use crate::types::DmdConfig;
    use std::f64::consts::PI;

    fn make_data(n_time: usize, decay: f64) -> Mat<f64> {
        let mut x = Mat::<f64>::zeros(2, n_time);
        for t in 0..n_time {
            let time = t as f64 * 0.1;
            let amp = (-decay * time).exp();
            x[(0, t)] = amp * (2.0 * PI * 0.5 * time).cos();
            x[(1, t)] = amp * (2.0 * PI * 0.5 * time).sin();
        }
        x
    }

    #[test]
    fn test_spectrum_oscillatory() {
        let x = make_data(100, 0.0);
        let result = compute_dmd(&x, &DmdConfig::default()).unwrap();
        let spec = dmd_spectrum(&result, 0.1);

        assert_eq!(spec.len(), 2);
        for m in &spec {
            assert!((m.frequency - 0.5).abs() < 1e-6, "freq = {}", m.frequency);
            assert_eq!(m.stability, Stability::Neutral);
        }
    }

    #[test]
    fn test_spectrum_decaying() {
        let x = make_data(100, 0.5);
        let result = compute_dmd(&x, &DmdConfig::default()).unwrap();
        let spec = dmd_spectrum(&result, 0.1);
        for m in &spec {
            assert_eq!(m.stability, Stability::Decaying);
            assert!((m.growth_rate + 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_amplitudes_reconstruct_state() {
        let x = make_data(50, 0.0);
        let result = compute_dmd(&x, &DmdConfig::default()).unwrap();
        let x0 = [x[(0, 0)], x[(1, 0)]];
        let b = mode_amplitudes(&result, &x0).unwrap();
        for (i, row) in result.modes.iter().enumerate() {
            let mut acc = C64::zero();
            for (phi, bj) in row.iter().zip(&b) {
                acc += *phi * *bj;
            }
            assert!((acc.re - x0[i]).abs() < 1e-10);
            assert!(acc.im.abs() < 1e-10);
        }
    }

    #[test]
    fn test_one_step_error_small() {
        let x = make_data(80, 0.2);
        let result = compute_dmd(&x, &DmdConfig::default()).unwrap();
        assert!(one_step_error(&result, &x).unwrap() < 1e-8);
    }

    #[test]
    fn test_amplitudes_wrong_length() {
        let x = make_data(20, 0.0);
        let result = compute_dmd(&x, &DmdConfig::default()).unwrap();
        assert!(mode_amplitudes(&result, &[1.0]).is_err());
    }
}
