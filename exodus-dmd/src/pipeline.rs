//! Snapshot preparation, decomposition, projection and differentiation.

use faer::Mat;
use serde::Deserialize;

use crate::dmd::compute_dmd;
use crate::field::VelocityField;
use crate::types::{DmdConfig, DmdResult, EigenOrder, PipelineError, C64, DEFAULT_SINGULAR_TOL};

/// Smallest number of snapshots the derivative stencil can work with.
pub const MIN_SNAPSHOTS: usize = 3;

/// Rank used when none is configured.
pub const DEFAULT_RANK: usize = 10;

/// Settings for a pipeline run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Truncation rank handed to the DMD engine.
    pub rank: usize,
    /// Relative zero threshold for singular values.
    pub singular_tol: f64,
    /// Ordering of the reported eigenpairs.
    pub order: EigenOrder,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rank: DEFAULT_RANK,
            singular_tol: DEFAULT_SINGULAR_TOL,
            order: EigenOrder::Magnitude,
        }
    }
}

impl PipelineConfig {
    pub fn dmd_config(&self) -> DmdConfig {
        DmdConfig {
            rank: Some(self.rank),
            singular_tol: self.singular_tol,
            order: self.order,
        }
    }
}

/// Everything a pipeline run produces, ready for persistence.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Sample times (T).
    pub times: Vec<f64>,
    /// Modal coefficients with the last mode column dropped (T × (r-1)).
    pub transformed_timeseries: Vec<Vec<C64>>,
    /// Finite-difference derivatives of the coefficients (T-2 × r).
    pub time_derivatives: Vec<Vec<C64>>,
    /// DMD modes (state_dim × r).
    pub dmd_modes: Vec<Vec<C64>>,
    /// DMD eigenvalues (r).
    pub dmd_eigs: Vec<C64>,
    /// Effective rank after clamping.
    pub rank: usize,
}

/// Differences between consecutive sample times, `times[i] - times[i + 1]`.
///
/// This is backward-minus-forward, so increasing times give negative steps.
/// The derivative below depends on this sign; it looks like an inverted
/// convention but changing it flips every stored derivative.
pub fn time_steps(times: &[f64]) -> Vec<f64> {
    times.windows(2).map(|w| w[0] - w[1]).collect()
}

/// Project snapshots onto the modes: Xᵀ Φ (T × r).
///
/// Plain transpose; the modes are not conjugated.
pub fn project_snapshots(x: &Mat<f64>, modes: &[Vec<C64>]) -> Vec<Vec<C64>> {
    let rank = modes.first().map_or(0, Vec::len);
    let n_vars = x.nrows();
    let modes_re = Mat::from_fn(n_vars, rank, |i, j| modes[i][j].re);
    let modes_im = Mat::from_fn(n_vars, rank, |i, j| modes[i][j].im);

    let xt = x.transpose();
    let proj_re = xt * &modes_re;
    let proj_im = xt * &modes_im;

    (0..x.ncols())
        .map(|t| {
            (0..rank)
                .map(|j| C64::new(proj_re[(t, j)], proj_im[(t, j)]))
                .collect()
        })
        .collect()
}

/// `steps[i] * (coeffs[i] - coeffs[i + 1])` for i in `0..T-2`.
pub fn time_derivatives(
    steps: &[f64],
    coeffs: &[Vec<C64>],
) -> Result<Vec<Vec<C64>>, PipelineError> {
    let n = coeffs.len();
    if n < MIN_SNAPSHOTS {
        return Err(PipelineError::InsufficientSnapshots {
            required: MIN_SNAPSHOTS,
            found: n,
        });
    }
    if steps.len() + 1 < n {
        return Err(PipelineError::ShapeMismatch(format!(
            "{} time steps for {n} coefficient rows",
            steps.len()
        )));
    }
    Ok((0..n - 2)
        .map(|i| {
            coeffs[i]
                .iter()
                .zip(&coeffs[i + 1])
                .map(|(&a, &b)| (a - b) * steps[i])
                .collect()
        })
        .collect())
}

/// Drop the last column of every row.
fn trim_last_column(rows: Vec<Vec<C64>>) -> Vec<Vec<C64>> {
    rows.into_iter()
        .map(|mut row| {
            row.pop();
            row
        })
        .collect()
}

/// Run the full decomposition on a velocity field.
///
/// Returns the decomposition itself alongside the packaged output so callers
/// can inspect modes without re-running the engine.
pub fn run_pipeline(
    field: &VelocityField,
    config: &PipelineConfig,
) -> Result<(DmdResult, PipelineOutput), PipelineError> {
    let num_times = field.num_times();
    if num_times < MIN_SNAPSHOTS {
        return Err(PipelineError::InsufficientSnapshots {
            required: MIN_SNAPSHOTS,
            found: num_times,
        });
    }

    let steps = time_steps(field.times());
    let data_matrix = field.to_snapshot_matrix();
    tracing::info!(
        times = num_times,
        nodes = field.num_nodes(),
        components = field.num_components(),
        "built snapshot matrix {}×{}",
        data_matrix.nrows(),
        data_matrix.ncols()
    );

    let result = compute_dmd(&data_matrix, &config.dmd_config())?;
    tracing::info!(
        rank = result.rank,
        "dynamic mode decomposition performed, modes {}×{}",
        result.n_vars(),
        result.rank
    );

    let transformed = project_snapshots(&data_matrix, &result.modes);
    let derivatives = time_derivatives(&steps, &transformed)?;
    tracing::info!(
        rows = derivatives.len(),
        cols = result.rank,
        "computed time derivatives"
    );

    let output = PipelineOutput {
        times: field.times().to_vec(),
        transformed_timeseries: trim_last_column(transformed),
        time_derivatives: derivatives,
        dmd_modes: result.modes.clone(),
        dmd_eigs: result.eigenvalues.clone(),
        rank: result.rank,
    };
    Ok((result, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::mode_real_field;
    use crate::types::DmdError;

    /// Undamped travelling wave on `num_nodes` nodes with 2 components.
    fn sinusoidal_field(num_times: usize, num_nodes: usize, omega: f64) -> VelocityField {
        let times: Vec<f64> = (0..num_times).map(|t| t as f64).collect();
        let mut data = Vec::with_capacity(num_times * num_nodes * 2);
        for t in 0..num_times {
            let phase = omega * t as f64;
            for node in 0..num_nodes {
                let k = 0.7 * node as f64;
                data.push((phase + k).cos());
                data.push(0.5 * (phase + k).sin());
            }
        }
        VelocityField::new(times, num_nodes, 2, data).unwrap()
    }

    #[test]
    fn test_time_steps_sign_convention() {
        assert_eq!(time_steps(&[0.0, 1.0, 2.0, 3.0]), vec![-1.0, -1.0, -1.0]);
        assert_eq!(time_steps(&[2.0, 1.5]), vec![0.5]);
        assert!(time_steps(&[1.0]).is_empty());
    }

    #[test]
    fn test_pipeline_shapes() {
        let field = sinusoidal_field(5, 4, 0.4);
        let config = PipelineConfig {
            rank: 2,
            ..Default::default()
        };
        let (_, out) = run_pipeline(&field, &config).unwrap();

        assert_eq!(out.rank, 2);
        assert_eq!(out.times.len(), 5);
        assert_eq!(out.transformed_timeseries.len(), 5);
        assert!(out.transformed_timeseries.iter().all(|r| r.len() == 1));
        assert_eq!(out.time_derivatives.len(), 3);
        assert!(out.time_derivatives.iter().all(|r| r.len() == 2));
        assert_eq!(out.dmd_modes.len(), 8);
        assert_eq!(out.dmd_eigs.len(), 2);
        for eig in &out.dmd_eigs {
            assert!((eig.norm() - 1.0).abs() < 1e-8, "|λ| = {}", eig.norm());
        }
    }

    #[test]
    fn test_pipeline_derivatives_match_projection() {
        let field = sinusoidal_field(6, 3, 0.3);
        let config = PipelineConfig {
            rank: 2,
            ..Default::default()
        };
        let (result, out) = run_pipeline(&field, &config).unwrap();
        let coeffs = project_snapshots(&field.to_snapshot_matrix(), &result.modes);
        for (i, row) in out.time_derivatives.iter().enumerate() {
            for (j, d) in row.iter().enumerate() {
                // times are 0, 1, 2, ... so every step is -1
                let expected = coeffs[i + 1][j] - coeffs[i][j];
                assert!((*d - expected).norm() < 1e-12);
            }
        }
        for (full, trimmed) in coeffs.iter().zip(&out.transformed_timeseries) {
            assert_eq!(&full[..1], &trimmed[..]);
        }
    }

    #[test]
    fn test_pipeline_two_snapshots() {
        let field = sinusoidal_field(2, 4, 0.4);
        let err = run_pipeline(&field, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientSnapshots {
                required: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn test_pipeline_propagates_rank_error() {
        let field = sinusoidal_field(5, 4, 0.4);
        let config = PipelineConfig {
            rank: 0,
            ..Default::default()
        };
        let err = run_pipeline(&field, &config).unwrap_err();
        assert!(matches!(err, PipelineError::Dmd(DmdError::InvalidInput(_))));
    }

    #[test]
    fn test_pipeline_rank_beyond_signal() {
        let field = sinusoidal_field(5, 4, 0.4);
        // Rank 10 clamps to min(8, 4) = 4, but the wave only spans 2 directions
        let config = PipelineConfig {
            rank: 10,
            ..Default::default()
        };
        let err = run_pipeline(&field, &config).unwrap_err();
        assert!(matches!(err, PipelineError::Dmd(DmdError::NumericalError(_))));
    }

    #[test]
    fn test_mode_real_field() {
        let field = sinusoidal_field(8, 5, 0.25);
        let config = PipelineConfig {
            rank: 2,
            ..Default::default()
        };
        let (result, _) = run_pipeline(&field, &config).unwrap();
        let vx = mode_real_field(&result, 0, 0, 2).unwrap();
        let vy = mode_real_field(&result, 0, 1, 2).unwrap();
        assert_eq!(vx.len(), 5);
        assert_eq!(vy.len(), 5);
        assert_eq!(vx[3], result.modes[6][0].re);
        assert!(mode_real_field(&result, 2, 0, 2).is_err());
        assert!(mode_real_field(&result, 0, 2, 2).is_err());
    }

    #[test]
    fn test_time_derivatives_too_short() {
        let coeffs = vec![vec![C64::zero()]; 2];
        assert!(time_derivatives(&[1.0], &coeffs).is_err());
    }
}
