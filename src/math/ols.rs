//! Least squares solver.
//!
//! Both ARIMA estimation stages are ordinary regressions:
//!
//! ```text
//! minimize Σ (y_t - x_t^T β)^2
//! ```
//!
//! The design matrices are tall (hundreds of days, at most a dozen columns) and
//! can be close to collinear for flat or sparse series, so we solve with SVD
//! rather than normal equations. (Nalgebra's `QR::solve` is intended for square
//! systems and will panic for non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() < x.ncols() || x.nrows() != y.len() {
        return None;
    }
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Build a design matrix from row vectors of equal width.
pub fn design_matrix(rows: &[Vec<f64>]) -> Option<DMatrix<f64>> {
    let ncols = rows.first()?.len();
    if rows.iter().any(|r| r.len() != ncols) {
        return None;
    }
    Some(DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn underdetermined_systems_are_rejected() {
        let x = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let y = DVector::from_row_slice(&[3.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }

    #[test]
    fn design_matrix_requires_rectangular_rows() {
        let m = design_matrix(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!((m.nrows(), m.ncols()), (3, 2));
        assert_eq!(m[(2, 1)], 6.0);
        assert!(design_matrix(&[vec![1.0], vec![1.0, 2.0]]).is_none());
        assert!(design_matrix(&[]).is_none());
    }
}
