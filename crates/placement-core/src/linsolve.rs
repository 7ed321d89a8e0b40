//! Dense linear solver used by the four-point homography fit.

use nalgebra::{DMatrix, DVector};

/// Smallest pivot magnitude accepted during elimination.
pub const PIVOT_TOLERANCE: f64 = 1e-12;

/// Errors returned by [`solve_linear_system`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearSolveError {
    #[error("singular system: no pivot above tolerance in column {column}")]
    Singular { column: usize },
    #[error("right-hand side has {got} entries, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("underdetermined system ({rows} equations, {unknowns} unknowns)")]
    Underdetermined { rows: usize, unknowns: usize },
}

/// Solve `A x = b` by Gauss-Jordan elimination with partial pivoting.
///
/// `a` is `n x m` with `n >= m`; the returned vector has `m` entries. For
/// `n > m` the surplus equations are reduced alongside but not checked for
/// consistency.
///
/// A column whose best remaining pivot is below [`PIVOT_TOLERANCE`] fails
/// with [`LinearSolveError::Singular`]; the column is never skipped.
pub fn solve_linear_system(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
) -> Result<DVector<f64>, LinearSolveError> {
    let (n, m) = a.shape();
    if b.len() != n {
        return Err(LinearSolveError::DimensionMismatch {
            expected: n,
            got: b.len(),
        });
    }
    if n < m {
        return Err(LinearSolveError::Underdetermined {
            rows: n,
            unknowns: m,
        });
    }

    // augmented [A | b]
    let mut aug = a.clone().insert_column(m, 0.0);
    aug.set_column(m, b);

    for col in 0..m {
        let mut pivot_row = col;
        let mut pivot_abs = aug[(col, col)].abs();
        for r in (col + 1)..n {
            let v = aug[(r, col)].abs();
            if v > pivot_abs {
                pivot_abs = v;
                pivot_row = r;
            }
        }

        if pivot_abs.is_nan() || pivot_abs < PIVOT_TOLERANCE {
            return Err(LinearSolveError::Singular { column: col });
        }

        if pivot_row != col {
            aug.swap_rows(col, pivot_row);
        }

        let pivot = aug[(col, col)];
        for c in col..=m {
            aug[(col, c)] /= pivot;
        }

        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = aug[(r, col)];
            if factor == 0.0 {
                continue;
            }
            for c in col..=m {
                let delta = factor * aug[(col, c)];
                aug[(r, c)] -= delta;
            }
        }
    }

    Ok(DVector::from_iterator(m, (0..m).map(|i| aug[(i, m)])))
}
