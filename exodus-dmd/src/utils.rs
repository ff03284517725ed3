use faer::Mat;

use crate::types::{DmdError, C64};

/// Validate that a matrix meets minimum dimension requirements and contains no NaN/Inf.
pub fn validate_matrix(x: &Mat<f64>, min_rows: usize, min_cols: usize) -> Result<(), DmdError> {
    let (rows, cols) = (x.nrows(), x.ncols());
    if rows < min_rows {
        return Err(DmdError::InvalidInput(format!(
            "matrix has {rows} rows, need at least {min_rows}"
        )));
    }
    if cols < min_cols {
        return Err(DmdError::InvalidInput(format!(
            "matrix has {cols} columns, need at least {min_cols}"
        )));
    }
    for j in 0..cols {
        for i in 0..rows {
            let val = x[(i, j)];
            if val.is_nan() || val.is_infinite() {
                return Err(DmdError::InvalidInput(
                    "matrix contains NaN or Inf values".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Determine the truncation rank given `available` singular values.
///
/// `None` keeps all of them. An explicit rank larger than `available` is
/// clamped to `available` and logged; zero is rejected.
pub fn determine_rank(available: usize, rank: Option<usize>) -> Result<usize, DmdError> {
    match rank {
        Some(0) => Err(DmdError::InvalidInput("rank must be positive".into())),
        Some(r) if r > available => {
            tracing::warn!(
                requested = r,
                available,
                "requested rank exceeds available singular values; truncating"
            );
            Ok(available)
        }
        Some(r) => Ok(r),
        None => Ok(available),
    }
}

/// Reject retained singular values that are zero relative to the largest one.
pub fn check_singular_values(s: &[f64], s_max: f64, tol: f64) -> Result<(), DmdError> {
    if s_max.is_nan() || s_max <= 0.0 {
        return Err(DmdError::NumericalError(
            "snapshot matrix X1 has no non-zero singular values".into(),
        ));
    }
    let cutoff = tol * s_max;
    if let Some(idx) = s.iter().position(|&sv| sv <= cutoff) {
        let sv = s[idx];
        return Err(DmdError::NumericalError(format!(
            "singular value {idx} ({sv:e}) is below {cutoff:e}; X1 is rank-deficient at the requested rank"
        )));
    }
    Ok(())
}

/// Solve a complex linear system Ax = b using Gaussian elimination.
pub fn complex_solve(a: &[Vec<C64>], b: &[C64]) -> Result<Vec<C64>, DmdError> {
    let n = b.len();
    let mut aug: Vec<Vec<C64>> = a
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut new_row = row.clone();
            new_row.push(b[i]);
            new_row
        })
        .collect();

    for col in 0..n {
        // Partial pivoting
        let mut max_norm = aug[col][col].norm();
        let mut max_row = col;
        for (row, aug_row) in aug.iter().enumerate().skip(col + 1) {
            let norm = aug_row[col].norm();
            if norm > max_norm {
                max_norm = norm;
                max_row = row;
            }
        }
        if max_norm < 1e-14 {
            return Err(DmdError::SolveFailed("singular matrix".into()));
        }
        aug.swap(col, max_row);

        let pivot = aug[col][col];
        for row in (col + 1)..n {
            let factor = aug[row][col] / pivot;
            for j in col..=n {
                let sub = factor * aug[col][j];
                aug[row][j] = aug[row][j] - sub;
            }
        }
    }

    // Back substitution
    let mut x = vec![C64::zero(); n];
    for i in (0..n).rev() {
        let mut sum = aug[i][n];
        for j in (i + 1)..n {
            sum = sum - aug[i][j] * x[j];
        }
        x[i] = sum / aug[i][i];
    }

    Ok(x)
}
