/// ols.rs — Ordinary Least Squares
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
///
/// BIVARIATE CASE  y = α + β·x + ε
///   β̂ = Σ(x_i − x̄)(y_i − ȳ) / Σ(x_i − x̄)²
///   α̂ = ȳ − β̂·x̄
///   residual_i = y_i − (α̂ + β̂·x_i)
///
/// GENERAL CASE  y = Xβ + ε  (k regressors including the intercept column)
///   β̂ = (XᵀX)⁻¹ Xᵀy, solved via Gaussian elimination on the small k×k
///   normal-equations system — k never exceeds a handful of ADF lags plus
///   the intercept and lagged level, so a full linear-algebra crate is not
///   warranted.
/// ─────────────────────────────────────────────────────────────────────────
use crate::error::ArbError;

#[derive(Debug, Clone)]
pub struct OlsResult {
    pub alpha: f64,
    pub beta: f64,
    pub residuals: Vec<f64>,
}

/// Fits `y = α + β·x + ε`. Fails with `SingularDesign` if `x` is (near)
/// constant or there are fewer than 2 observations.
pub fn ols_bivariate(y: &[f64], x: &[f64]) -> Result<OlsResult, ArbError> {
    if y.len() != x.len() {
        return Err(ArbError::SingularDesign("y and x have different lengths".into()));
    }
    let n = y.len();
    if n < 2 {
        return Err(ArbError::SingularDesign("fewer than 2 observations".into()));
    }

    let x_bar = x.iter().sum::<f64>() / n as f64;
    let y_bar = y.iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for i in 0..n {
        let dx = x[i] - x_bar;
        sxx += dx * dx;
        sxy += dx * (y[i] - y_bar);
    }

    if sxx.abs() < 1e-12 {
        return Err(ArbError::SingularDesign("x is constant (degenerate design)".into()));
    }

    let beta = sxy / sxx;
    let alpha = y_bar - beta * x_bar;
    let residuals: Vec<f64> = (0..n).map(|i| y[i] - (alpha + beta * x[i])).collect();

    Ok(OlsResult { alpha, beta, residuals })
}

/// General small-`k` OLS via the normal equations, solved by Gaussian
/// elimination with partial pivoting. `rows` is the design matrix (each
/// inner `Vec` one regressor column, including a constant column of ones if
/// an intercept is wanted); `y` is the response.
///
/// Returns the coefficient vector in the same order as `rows`'s columns.
pub fn ols_general(y: &[f64], columns: &[Vec<f64>]) -> Result<Vec<f64>, ArbError> {
    let n = y.len();
    let k = columns.len();
    if k == 0 || n < k + 1 {
        return Err(ArbError::SingularDesign("insufficient observations for regressor count".into()));
    }
    for col in columns {
        if col.len() != n {
            return Err(ArbError::SingularDesign("column length mismatch".into()));
        }
    }

    // Normal equations: (XᵀX) β = Xᵀy
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        for j in 0..k {
            xtx[i][j] = (0..n).map(|r| columns[i][r] * columns[j][r]).sum();
        }
        xty[i] = (0..n).map(|r| columns[i][r] * y[r]).sum();
    }

    solve_linear_system(xtx, xty)
}

/// Gaussian elimination with partial pivoting for a small dense `k×k` system.
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ArbError> {
    let k = b.len();
    for col in 0..k {
        // partial pivot
        let mut pivot_row = col;
        let mut pivot_val = a[col][col].abs();
        for row in (col + 1)..k {
            if a[row][col].abs() > pivot_val {
                pivot_val = a[row][col].abs();
                pivot_row = row;
            }
        }
        if pivot_val < 1e-12 {
            return Err(ArbError::SingularDesign("singular normal-equations matrix".into()));
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let diag = a[col][col];
        for row in (col + 1)..k {
            let factor = a[row][col] / diag;
            if factor == 0.0 {
                continue;
            }
            for c in col..k {
                a[row][c] -= factor * a[col][c];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; k];
    for row in (0..k).rev() {
        let mut sum = b[row];
        for c in (row + 1)..k {
            sum -= a[row][c] * x[c];
        }
        x[row] = sum / a[row][row];
    }
    Ok(x)
}

/// Inverts a small dense `k×k` matrix via Gauss-Jordan elimination with
/// partial pivoting. Used by the ADF kernel to get coefficient standard
/// errors from `(XᵀX)⁻¹`.
pub fn invert_small(a: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ArbError> {
    let k = a.len();
    let mut m: Vec<Vec<f64>> = a.to_vec();
    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..k {
        let mut pivot_row = col;
        let mut pivot_val = m[col][col].abs();
        for row in (col + 1)..k {
            if m[row][col].abs() > pivot_val {
                pivot_val = m[row][col].abs();
                pivot_row = row;
            }
        }
        if pivot_val < 1e-12 {
            return Err(ArbError::SingularDesign("singular matrix in invert_small".into()));
        }
        m.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let diag = m[col][col];
        for c in 0..k {
            m[col][c] /= diag;
            inv[col][c] /= diag;
        }
        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = m[row][col];
            if factor == 0.0 {
                continue;
            }
            for c in 0..k {
                m[row][c] -= factor * m[col][c];
                inv[row][c] -= factor * inv[col][c];
            }
        }
    }
    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bivariate_recovers_known_line() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&xi| 2.0 + 3.0 * xi).collect();
        let fit = ols_bivariate(&y, &x).unwrap();
        assert!((fit.alpha - 2.0).abs() < 1e-9);
        assert!((fit.beta - 3.0).abs() < 1e-9);
        assert!(fit.residuals.iter().all(|r| r.abs() < 1e-9));
    }

    #[test]
    fn bivariate_rejects_constant_x() {
        let x = vec![1.0; 10];
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert!(ols_bivariate(&y, &x).is_err());
    }

    #[test]
    fn general_matches_bivariate_with_intercept_column() {
        let n = 30;
        let x: Vec<f64> = (0..n).map(|i| i as f64 * 0.7).collect();
        let y: Vec<f64> = x.iter().map(|&xi| -1.5 + 0.25 * xi).collect();
        let ones = vec![1.0; n];
        let coeffs = ols_general(&y, &[ones, x]).unwrap();
        assert!((coeffs[0] - (-1.5)).abs() < 1e-8);
        assert!((coeffs[1] - 0.25).abs() < 1e-8);
    }

    #[test]
    fn invert_small_recovers_identity_product() {
        let a = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = invert_small(&a).unwrap();
        // a * inv ≈ I
        for i in 0..2 {
            for j in 0..2 {
                let v: f64 = (0..2).map(|k| a[i][k] * inv[k][j]).sum();
                let expect = if i == j { 1.0 } else { 0.0 };
                assert!((v - expect).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn general_rejects_underdetermined_system() {
        let y = vec![1.0, 2.0];
        let ones = vec![1.0, 1.0];
        let x1 = vec![1.0, 2.0];
        let x2 = vec![2.0, 4.0]; // collinear with x1, and n < k+1 anyway
        assert!(ols_general(&y, &[ones, x1, x2]).is_err());
    }
}
