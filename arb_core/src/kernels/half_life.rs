/// half_life.rs — Ornstein-Uhlenbeck Half-Life of Mean Reversion
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
///   Δs_t = λ·s_{t-1} + c + ε_t     (OLS fit)
///   half_life = −ln(2) / λ          when λ < 0 and |λ| ≥ 10⁻⁶
///   half_life = −1.0                ("no reversion") otherwise
///
/// A negative λ means the spread pulls back toward its mean each step; the
/// magnitude sets the speed. Guarding `|λ| ≥ 10⁻⁶` avoids reporting an
/// absurdly large half-life from a coefficient that is statistically zero.
/// ─────────────────────────────────────────────────────────────────────────
use crate::kernels::ols::ols_bivariate;

const LN_2: f64 = std::f64::consts::LN_2;
const LAMBDA_EPS: f64 = 1e-6;

/// Computes the half-life (in bars) of mean reversion for `spread`.
/// Returns `-1.0` when the fitted λ shows no reversion (λ ≥ 0) or is
/// effectively zero.
pub fn half_life(spread: &[f64]) -> f64 {
    if spread.len() < 3 {
        return -1.0;
    }
    let lagged: Vec<f64> = spread[..spread.len() - 1].to_vec();
    let delta: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();

    let fit = match ols_bivariate(&delta, &lagged) {
        Ok(f) => f,
        Err(_) => return -1.0,
    };
    let lambda = fit.beta;

    if lambda < 0.0 && lambda.abs() >= LAMBDA_EPS {
        -LN_2 / lambda
    } else {
        -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_reverting_spread_has_positive_half_life() {
        let mut x = 5.0f64;
        let mut state = 11u64;
        let mut series = Vec::with_capacity(300);
        for _ in 0..300 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let u = ((state >> 11) as f64) / ((1u64 << 53) as f64);
            x = 0.9 * x + (u - 0.5) * 0.2; // lambda ≈ -0.1
            series.push(x);
        }
        let h = half_life(&series);
        assert!(h > 0.0, "expected positive half-life, got {h}");
        // λ ≈ -0.1 ⇒ half-life ≈ ln(2)/0.1 ≈ 6.9
        assert!(h > 2.0 && h < 20.0, "half-life out of expected range: {h}");
    }

    #[test]
    fn non_reverting_series_returns_negative_one() {
        // a pure upward trend: Δs is roughly constant regardless of level ⇒ λ ≈ 0
        let series: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert_eq!(half_life(&series), -1.0);
    }

    #[test]
    fn too_short_returns_negative_one() {
        assert_eq!(half_life(&[1.0, 2.0]), -1.0);
    }
}
