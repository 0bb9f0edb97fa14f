/// adf.rs — Augmented Dickey-Fuller Unit-Root Test
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
///
/// Regression (constant, no trend — the case this crate always uses):
///   Δy_t = γ·y_{t-1} + Σ_{i=1}^{p} δ_i·Δy_{t-i} + c + ε_t
///
/// Null hypothesis H0: γ = 0 (series has a unit root, non-stationary).
/// Test statistic: τ = γ̂ / SE(γ̂), compared against the Dickey-Fuller
/// distribution (not Student's t — the asymptotic distribution under H0 is
/// non-standard and left-skewed).
///
/// LAG SELECTION (Schwert's rule, the common automatic default):
///   p = floor(12 · (n / 100)^0.25), truncated at n/2 − 2 and at least 0.
///
/// P-VALUE: interpolated from a MacKinnon-style critical-value grid for the
/// "constant, no trend" case (linear interpolation between published
/// quantiles, clamped at the ends) rather than the full MacKinnon response-
/// surface regression — a deliberate simplification for a from-scratch
/// implementation; see DESIGN.md.
/// ─────────────────────────────────────────────────────────────────────────
use crate::kernels::ols::{invert_small, ols_general};

/// Critical-value grid for the Dickey-Fuller distribution, constant-only
/// case, asymptotic (large-sample) regime: `(critical_value, left_tail_prob)`
/// pairs sorted ascending by critical value. Sourced from the commonly cited
/// Dickey-Fuller / MacKinnon percentile tables for this regression case.
const DF_GRID: &[(f64, f64)] = &[
    (-4.38, 0.001),
    (-3.96, 0.005),
    (-3.43, 0.01),
    (-3.12, 0.025),
    (-2.86, 0.05),
    (-2.57, 0.10),
    (-2.23, 0.20),
    (-1.95, 0.30),
    (-1.62, 0.50),
    (-1.28, 0.65),
    (-0.93, 0.80),
    (-0.66, 0.875),
    (-0.19, 0.95),
    (0.19, 0.975),
    (0.85, 0.995),
];

fn mackinnon_pvalue(tau: f64) -> f64 {
    if tau <= DF_GRID[0].0 {
        return DF_GRID[0].1;
    }
    let last = DF_GRID[DF_GRID.len() - 1];
    if tau >= last.0 {
        return last.1;
    }
    for w in DF_GRID.windows(2) {
        let (x0, p0) = w[0];
        let (x1, p1) = w[1];
        if tau >= x0 && tau <= x1 {
            let t = (tau - x0) / (x1 - x0);
            return p0 + t * (p1 - p0);
        }
    }
    1.0
}

/// Schwert's rule for automatic ADF lag order selection.
fn schwert_lags(n: usize) -> usize {
    if n < 8 {
        return 0;
    }
    let p = (12.0 * (n as f64 / 100.0).powf(0.25)).floor() as i64;
    let max_lags = (n as i64 / 2) - 2;
    p.clamp(0, max_lags.max(0)) as usize
}

/// Returns the p-value of the ADF unit-root test on `series`, with automatic
/// lag selection. Returns `1.0` (treated as "non-stationary" by callers) on
/// any internal failure — too few observations, a singular design, or a
/// degenerate lag count.
pub fn adf_test(series: &[f64]) -> f64 {
    adf_test_with_lags(series, None)
}

/// As `adf_test`, but with an explicit lag order (mainly for tests). `None`
/// selects lags automatically via Schwert's rule.
pub fn adf_test_with_lags(series: &[f64], lags: Option<usize>) -> f64 {
    let n_levels = series.len();
    if n_levels < 10 {
        return 1.0;
    }

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let p = lags.unwrap_or_else(|| schwert_lags(n_levels));

    // Usable rows: we need y_{t-1} and p lagged diffs, so the first usable
    // diff index is `p` (0-indexed into `diffs`).
    if diffs.len() <= p + 2 {
        return 1.0;
    }
    let start = p;
    let m = diffs.len() - start; // number of regression rows

    let y_dep: Vec<f64> = (start..diffs.len()).map(|t| diffs[t]).collect();
    let y_lag1: Vec<f64> = (start..diffs.len()).map(|t| series[t]).collect(); // series[t] is the lagged level for diffs[t] = series[t+1] - series[t]
    let intercept = vec![1.0; m];

    let mut columns = vec![intercept, y_lag1.clone()];
    for lag in 1..=p {
        let col: Vec<f64> = (start..diffs.len()).map(|t| diffs[t - lag]).collect();
        columns.push(col);
    }

    let coeffs = match ols_general(&y_dep, &columns) {
        Ok(c) => c,
        Err(_) => return 1.0,
    };
    let gamma = coeffs[1];

    // residual variance
    let k = columns.len();
    let fitted: Vec<f64> = (0..m)
        .map(|row| (0..k).map(|c| coeffs[c] * columns[c][row]).sum::<f64>())
        .collect();
    let rss: f64 = (0..m).map(|row| (y_dep[row] - fitted[row]).powi(2)).sum();
    if m <= k {
        return 1.0;
    }
    let sigma2 = rss / (m - k) as f64;

    let mut xtx = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in 0..k {
            xtx[i][j] = (0..m).map(|row| columns[i][row] * columns[j][row]).sum();
        }
    }
    let xtx_inv = match invert_small(&xtx) {
        Ok(inv) => inv,
        Err(_) => return 1.0,
    };
    let se_gamma = (sigma2 * xtx_inv[1][1]).sqrt();
    if !se_gamma.is_finite() || se_gamma < 1e-12 {
        return 1.0;
    }

    let tau = gamma / se_gamma;
    if !tau.is_finite() {
        return 1.0;
    }
    mackinnon_pvalue(tau)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcg_series(n: usize, seed: u64, drift: f64) -> Vec<f64> {
        let mut state = seed;
        let mut x = 100.0;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let u = ((state >> 11) as f64) / ((1u64 << 53) as f64);
            x += drift + (u - 0.5) * 2.0;
            out.push(x);
        }
        out
    }

    #[test]
    fn schwert_lags_grows_with_n() {
        assert!(schwert_lags(100) >= schwert_lags(25));
        assert_eq!(schwert_lags(5), 0);
    }

    #[test]
    fn random_walk_is_not_stationary() {
        // a pure random walk should fail to reject the unit-root null (high p-value)
        let series = lcg_series(500, 42, 0.0);
        let p = adf_test(&series);
        assert!(p > 0.05, "expected high p-value for a random walk, got {p}");
    }

    #[test]
    fn mean_reverting_series_is_stationary() {
        // AR(1) with strong mean reversion around 0 should reject the unit-root null
        let mut x = 0.0f64;
        let mut state = 7u64;
        let mut series = Vec::with_capacity(500);
        for _ in 0..500 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let u = ((state >> 11) as f64) / ((1u64 << 53) as f64);
            x = 0.3 * x + (u - 0.5) * 0.5;
            series.push(x);
        }
        let p = adf_test(&series);
        assert!(p < 0.05, "expected low p-value for a mean-reverting series, got {p}");
    }

    #[test]
    fn too_short_series_returns_one() {
        let series = vec![1.0, 2.0, 3.0];
        assert_eq!(adf_test(&series), 1.0);
    }

    #[test]
    fn mackinnon_pvalue_clamped_at_ends() {
        assert_eq!(mackinnon_pvalue(-100.0), DF_GRID[0].1);
        assert_eq!(mackinnon_pvalue(100.0), DF_GRID[DF_GRID.len() - 1].1);
    }
}
