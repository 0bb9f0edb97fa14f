/// pair_finder.rs — Pair Discovery over a Formation Window
///
/// Three-gate cascade (correlation screen → per-leg stationarity precheck →
/// cointegration → half-life gate), short-circuiting in that order, run over
/// every unordered symbol pair in the supplied aligned close matrix. See
/// SPEC_FULL.md §4.C for the full algorithm; the per-leg stationarity
/// precheck sign below is the econometrically correct reading — the system
/// this crate's pair-finding logic is adapted from mixes this sign in one
/// code path, rejecting a pair when either leg *is* already stationary
/// (backwards). We require both legs to be non-stationary (ADF p ≥ ADF_P),
/// which is the correct I(1) precondition for cointegration.
use crate::candle::AlignedCloseMatrix;
use crate::config::ArbConfig;
use crate::kernels::{adf_test, half_life, ols_bivariate, pearson};
use rayon::prelude::*;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PairInfo {
    pub s1: String,
    pub s2: String,
    pub half_life: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl PairInfo {
    pub fn key(&self) -> String {
        format!("{}_{}", self.s1, self.s2)
    }
}

/// Runs the full gate cascade over `matrix` and returns the admitted pairs,
/// sorted lexicographically by `(s1, s2)` for deterministic downstream
/// iteration order (§5's ordering guarantee).
pub fn find_cointegrated_pairs(matrix: &AlignedCloseMatrix, cfg: &ArbConfig) -> Vec<PairInfo> {
    let n_rows = matrix.num_rows();
    let min_obs = (0.8 * n_rows as f64) as usize;

    // Gate 0: log-prices, drop symbols with too few observations (a fully
    // aligned matrix never has nulls, but a degenerate all-zero/negative
    // column would poison the log transform — guard against it here).
    let log_columns: Vec<(String, Vec<f64>)> = matrix
        .symbols
        .iter()
        .zip(matrix.closes.iter())
        .filter(|(_, col)| col.len() >= min_obs && col.iter().all(|&p| p > 0.0))
        .map(|(sym, col)| (sym.clone(), col.iter().map(|p| p.ln()).collect()))
        .collect();

    // All unordered candidate pairs, lexicographically ordered within each pair.
    let mut candidates: Vec<(usize, usize)> = Vec::new();
    for i in 0..log_columns.len() {
        for j in (i + 1)..log_columns.len() {
            let (s1, s2) = if log_columns[i].0 <= log_columns[j].0 { (i, j) } else { (j, i) };
            candidates.push((s1, s2));
        }
    }

    let mut admitted: Vec<PairInfo> = candidates
        .par_iter()
        .filter_map(|&(i, j)| evaluate_pair(&log_columns[i], &log_columns[j], cfg))
        .collect();

    admitted.sort_by(|a, b| (a.s1.as_str(), a.s2.as_str()).cmp(&(b.s1.as_str(), b.s2.as_str())));
    debug!(candidates = candidates.len(), admitted = admitted.len(), "pair-finder cascade complete");
    admitted
}

fn evaluate_pair(
    leg1: &(String, Vec<f64>),
    leg2: &(String, Vec<f64>),
    cfg: &ArbConfig,
) -> Option<PairInfo> {
    let (s1, log_p1) = leg1;
    let (s2, log_p2) = leg2;

    // Gate 1: correlation screen.
    let corr = pearson(log_p1, log_p2);
    if corr <= cfg.corr_threshold {
        return None;
    }

    // Gate 2: per-leg stationarity precheck — require BOTH legs to be
    // non-stationary (I(1)) individually.
    let adf_leg1 = adf_test(log_p1);
    let adf_leg2 = adf_test(log_p2);
    if adf_leg1 < cfg.adf_p || adf_leg2 < cfg.adf_p {
        debug!(%s1, %s2, corr, adf_leg1, adf_leg2, "rejected: per-leg stationarity precheck");
        return None;
    }

    // Gate 3: cointegration — OLS hedge ratio, then ADF on the residual spread.
    let fit = match ols_bivariate(log_p1, log_p2) {
        Ok(fit) => fit,
        Err(err) => {
            warn!(%s1, %s2, %err, "skipping pair: singular cointegration design");
            return None;
        }
    };
    let adf_spread = adf_test(&fit.residuals);
    if adf_spread >= cfg.adf_p {
        debug!(%s1, %s2, corr, adf_spread, "rejected: spread not stationary");
        return None;
    }

    // Gate 4: half-life.
    let h = half_life(&fit.residuals);
    if h < cfg.min_half_life || h > cfg.max_half_life {
        debug!(%s1, %s2, half_life = h, min = cfg.min_half_life, max = cfg.max_half_life, "rejected: half-life gate");
        return None;
    }

    debug!(%s1, %s2, corr, adf_spread, half_life = h, alpha = fit.alpha, beta = fit.beta, "admitted");
    Some(PairInfo {
        s1: s1.clone(),
        s2: s2.clone(),
        half_life: h,
        alpha: fit.alpha,
        beta: fit.beta,
    })
}
