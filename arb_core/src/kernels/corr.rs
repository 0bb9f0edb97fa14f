/// corr.rs — Pearson Correlation
///
/// Pairwise Pearson correlation on the columns of an aligned matrix, used
/// by the pair finder's correlation screen (§4.C gate 1).
use crate::candle::AlignedCloseMatrix;

/// Pearson correlation coefficient between two equal-length series.
/// Returns `0.0` if either series has zero variance (degenerate input —
/// the caller's correlation-threshold gate will simply reject it).
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let a_bar = a[..n].iter().sum::<f64>() / n as f64;
    let b_bar = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - a_bar;
        let db = b[i] - b_bar;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a.abs() < 1e-12 || var_b.abs() < 1e-12 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Full pairwise Pearson correlation matrix across every symbol column in
/// `matrix`, expressed on log-prices (the caller passes log-transformed
/// columns in — this kernel is agnostic to the transform).
pub fn correlation_matrix(matrix: &AlignedCloseMatrix) -> Vec<Vec<f64>> {
    let k = matrix.symbols.len();
    let mut out = vec![vec![0.0; k]; k];
    for i in 0..k {
        out[i][i] = 1.0;
        for j in (i + 1)..k {
            let r = pearson(&matrix.closes[i], &matrix.closes[j]);
            out[i][j] = r;
            out[j][i] = r;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfectly_correlated_series() {
        let a: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let b: Vec<f64> = a.iter().map(|&x| 2.0 * x + 5.0).collect();
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn perfectly_anti_correlated_series() {
        let a: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let b: Vec<f64> = a.iter().map(|&x| -x).collect();
        assert!((pearson(&a, &b) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_variance_series_returns_zero() {
        let a = vec![5.0; 10];
        let b: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_eq!(pearson(&a, &b), 0.0);
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let a: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let b: Vec<f64> = a.iter().map(|&x| 2.0 * x + 5.0).collect();
        let c: Vec<f64> = a.iter().map(|&x| -x).collect();
        let matrix = AlignedCloseMatrix {
            timestamps: (0..20).collect(),
            symbols: vec!["A".into(), "B".into(), "C".into()],
            closes: vec![a, b, c],
        };
        let m = correlation_matrix(&matrix);
        assert_eq!(m.len(), 3);
        for row in &m {
            assert_eq!(row.len(), 3);
        }
        for i in 0..3 {
            assert_eq!(m[i][i], 1.0);
        }
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
        assert!((m[0][1] - 1.0).abs() < 1e-9); // A vs B: perfectly correlated
        assert!((m[0][2] + 1.0).abs() < 1e-9); // A vs C: perfectly anti-correlated
    }
}
