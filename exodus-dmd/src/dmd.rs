use faer::Mat;

use crate::types::{DmdConfig, DmdError, DmdResult, EigenOrder, SvdComponents, C64};
use crate::utils::{check_singular_values, determine_rank, validate_matrix};

/// Perform Dynamic Mode Decomposition on a snapshot matrix.
///
/// # Arguments
/// * `x` - Snapshot matrix (state_dim × n snapshots), columns are time-ordered.
/// * `config` - Truncation rank, singular-value tolerance and eigenpair ordering.
///
/// # Algorithm
/// 1. Split X into X₁ = X[:, 0..n-1] and X₂ = X[:, 1..n]
/// 2. Thin SVD: X₁ = U Σ Vᵀ, truncated to r = min(rank, k)
/// 3. Reduced operator: Ã = Uᵀ X₂ V Σ⁻¹
/// 4. Eigendecomposition: Ã W = W Λ
/// 5. Projected DMD modes: Φ = U W
///
/// `eigenvalues[j]` always belongs to mode column j. With
/// [`EigenOrder::Solver`] no particular order is guaranteed.
pub fn compute_dmd(x: &Mat<f64>, config: &DmdConfig) -> Result<DmdResult, DmdError> {
    if config.rank == Some(0) {
        return Err(DmdError::InvalidInput("rank must be positive".into()));
    }
    validate_matrix(x, 1, 2)?;

    let n_vars = x.nrows();
    let n_time = x.ncols();

    // Split into X1 (current) and X2 (next)
    let x1 = x.subcols(0, n_time - 1).to_owned();
    let x2 = x.subcols(1, n_time - 1).to_owned();

    let svd = x1
        .thin_svd()
        .map_err(|e| DmdError::SvdFailed(format!("{e:?}")))?;
    let s_col = svd.S().column_vector();
    let n_sv = s_col.nrows();
    let s_vals: Vec<f64> = (0..n_sv).map(|i| s_col[i]).collect();
    let s_max = s_vals.iter().copied().fold(0.0_f64, f64::max);

    let rank = determine_rank(n_sv, config.rank)?;
    tracing::debug!(singular_values = ?s_vals, rank, "truncated SVD of X1");

    let u = svd.U().subcols(0, rank).to_owned();
    let v = svd.V().subcols(0, rank).to_owned();
    let s: Vec<f64> = s_vals[..rank].to_vec();
    check_singular_values(&s, s_max, config.singular_tol)?;

    // Reduced DMD matrix: Ã = Uᵀ X₂ V Σ⁻¹
    let ut_x2 = u.transpose() * &x2; // (r × n-1)
    let ut_x2_v = &ut_x2 * &v; // (r × r)

    let mut a_tilde = Mat::<f64>::zeros(rank, rank);
    for i in 0..rank {
        for j in 0..rank {
            a_tilde[(i, j)] = ut_x2_v[(i, j)] / s[j];
        }
    }

    let eigen = a_tilde
        .as_ref()
        .eigen()
        .map_err(|e| DmdError::EigenFailed(format!("{e:?}")))?;
    let eigenvalues_diag = eigen.S().column_vector();
    let eigenvectors = eigen.U();

    let mut eigenvalues = Vec::with_capacity(rank);
    let mut w = vec![vec![C64::zero(); rank]; rank];
    for j in 0..rank {
        let ev = eigenvalues_diag[j];
        if !ev.re.is_finite() || !ev.im.is_finite() {
            return Err(DmdError::EigenFailed(format!(
                "eigenvalue {j} of the reduced operator is not finite"
            )));
        }
        eigenvalues.push(C64::new(ev.re, ev.im));
        for i in 0..rank {
            let entry = eigenvectors[(i, j)];
            w[i][j] = C64::new(entry.re, entry.im);
        }
    }
    normalize_columns(&mut w)?;

    let order = eigen_order(&eigenvalues, config.order);
    let eigenvalues: Vec<C64> = order.iter().map(|&j| eigenvalues[j]).collect();

    // Split the permuted W into real/imaginary parts for the real U product
    let mut w_re = Mat::<f64>::zeros(rank, rank);
    let mut w_im = Mat::<f64>::zeros(rank, rank);
    for (dst, &src) in order.iter().enumerate() {
        for i in 0..rank {
            w_re[(i, dst)] = w[i][src].re;
            w_im[(i, dst)] = w[i][src].im;
        }
    }

    // Φ = U W
    let modes_re = &u * &w_re;
    let modes_im = &u * &w_im;

    let mut modes = vec![vec![C64::zero(); rank]; n_vars];
    for (i, row) in modes.iter_mut().enumerate() {
        for (j, m) in row.iter_mut().enumerate() {
            *m = C64::new(modes_re[(i, j)], modes_im[(i, j)]);
        }
    }

    tracing::debug!(
        state_dim = n_vars,
        snapshots = n_time,
        rank,
        "dynamic mode decomposition complete"
    );

    Ok(DmdResult {
        modes,
        eigenvalues,
        rank,
        requested_rank: config.rank,
        svd: SvdComponents { u, s, v },
        a_tilde,
        data_dim: (n_vars, n_time),
    })
}

/// Scale every column of `w` to unit 2-norm.
fn normalize_columns(w: &mut [Vec<C64>]) -> Result<(), DmdError> {
    let rank = w.first().map_or(0, Vec::len);
    for j in 0..rank {
        let norm = w.iter().map(|row| row[j].norm_sqr()).sum::<f64>().sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Err(DmdError::EigenFailed(format!(
                "eigenvector {j} has degenerate norm {norm}"
            )));
        }
        for row in w.iter_mut() {
            row[j] = row[j] / norm;
        }
    }
    Ok(())
}

/// Permutation applied jointly to the eigenvalues and eigenvector columns.
fn eigen_order(eigenvalues: &[C64], order: EigenOrder) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..eigenvalues.len()).collect();
    if order == EigenOrder::Magnitude {
        idx.sort_by(|&a, &b| {
            let (la, lb) = (eigenvalues[a], eigenvalues[b]);
            lb.norm()
                .total_cmp(&la.norm())
                .then(lb.im.total_cmp(&la.im))
        });
    }
    idx
}
