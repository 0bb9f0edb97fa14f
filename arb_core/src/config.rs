/// config.rs — Centralised configuration loaded from .env
///
/// All parameters consumed by the pair-discovery/signal pipeline are defined
/// here. Loading happens once at startup; every module borrows `&ArbConfig`.
use crate::error::ConfigError;
use std::env;

#[derive(Debug, Clone)]
pub struct ArbConfig {
    // ── universe & timeframe ──────────────────────────────────────────────
    pub timeframe: String,
    pub symbols_to_test: Vec<String>,

    // ── formation / recalculation ─────────────────────────────────────────
    pub formation_period_days: usize,
    pub pair_recalc_period_days: usize,
    pub rolling_window: usize,

    // ── pair finder gates ──────────────────────────────────────────────────
    pub corr_threshold: f64,
    pub adf_p: f64,
    pub min_half_life: f64,
    pub max_half_life: f64,

    // ── signal engine thresholds ───────────────────────────────────────────
    pub z_entry: f64,
    pub z_exit: f64,
    pub z_stop: f64,
    pub time_stop_factor: f64,

    // ── backtest sizing ────────────────────────────────────────────────────
    pub initial_capital: f64,
    pub max_concurrent_pairs: usize,
    pub trade_notional_per_pair: f64,
    pub fixed_theoretical_notional: f64,

    // ── backtest cost model ────────────────────────────────────────────────
    pub transaction_cost_bps: f64,
    pub annual_borrow_cost_percent: f64,

    // ── reporting ──────────────────────────────────────────────────────────
    pub output_file_name: String,

    // ── candle data source ──────────────────────────────────────────────────
    pub data_dir: String,

    // ── live driver cadence (ambient operational knob) ─────────────────────
    pub cycle_interval_seconds: u64,

    // ── out-of-scope broker credentials; carried only because the
    //    environment these settings load from is shared with the
    //    (out-of-scope) broker client ───────────────────────────────────────
    pub client_id: Option<String>,
    pub access_token: Option<String>,
}

impl ArbConfig {
    /// Load configuration from environment variables (after dotenv).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // ignore missing .env

        Ok(Self {
            timeframe: env::var("TIMEFRAME").unwrap_or_else(|_| "D".into()),
            symbols_to_test: parse_env_list("SYMBOLS_TO_TEST", Vec::new()),

            formation_period_days: parse_env("FORMATION_PERIOD_DAYS", 252usize)?,
            pair_recalc_period_days: parse_env("PAIR_RECALC_PERIOD_DAYS", 30usize)?,
            rolling_window: parse_env("ROLLING_WINDOW", 60usize)?,

            corr_threshold: parse_env("CORR_THRESHOLD", 0.90)?,
            adf_p: parse_env("ADF_P", 0.01)?,
            min_half_life: parse_env("MIN_HALF_LIFE", 5.0)?,
            max_half_life: parse_env("MAX_HALF_LIFE", 100.0)?,

            z_entry: parse_env("Z_ENTRY", 2.5)?,
            z_exit: parse_env("Z_EXIT", 0.5)?,
            z_stop: parse_env("Z_STOP", 3.0)?,
            time_stop_factor: parse_env("TIME_STOP_FACTOR", 2.5)?,

            initial_capital: parse_env("INITIAL_CAPITAL", 1_000_000.0)?,
            max_concurrent_pairs: parse_env("MAX_CONCURRENT_PAIRS", 10usize)?,
            trade_notional_per_pair: parse_env("TRADE_NOTIONAL_PER_PAIR", 100_000.0)?,
            fixed_theoretical_notional: parse_env("FIXED_THEORETICAL_NOTIONAL", 10_000.0)?,

            transaction_cost_bps: parse_env("TRANSACTION_COST_BPS", 5.0)?,
            annual_borrow_cost_percent: parse_env("ANNUAL_BORROW_COST_PERCENT", 1.5)?,

            output_file_name: env::var("OUTPUT_FILE_NAME")
                .unwrap_or_else(|_| "trade_log.csv".into()),

            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".into()),

            cycle_interval_seconds: parse_env("CYCLE_INTERVAL_SECONDS", 900u64)?,

            client_id: env::var("CLIENT_ID").ok(),
            access_token: env::var("ACCESS_TOKEN").ok(),
        })
    }
}

fn parse_env<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map_err(|e| ConfigError::Parse { key, source: Box::new(e) }),
        Err(_) => Ok(default),
    }
}

/// Parses a comma-separated env var into a `Vec<String>`, trimming whitespace
/// and dropping empty entries. Falls back to `default` when unset.
fn parse_env_list(key: &str, default: Vec<String>) -> Vec<String> {
    match env::var(key) {
        Ok(v) => v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn parse_env_list_splits_and_trims() {
        std::env::set_var("TEST_SYMS_AC1", " RELIANCE, TCS ,INFY");
        let v = parse_env_list("TEST_SYMS_AC1", Vec::new());
        assert_eq!(v, vec!["RELIANCE", "TCS", "INFY"]);
        std::env::remove_var("TEST_SYMS_AC1");
    }

    #[test]
    fn parse_env_list_default_when_unset() {
        std::env::remove_var("TEST_SYMS_AC2_NOPE");
        let v = parse_env_list("TEST_SYMS_AC2_NOPE", vec!["A".into()]);
        assert_eq!(v, vec!["A".to_string()]);
    }

    #[test]
    fn parse_env_reports_bad_key() {
        std::env::set_var("TEST_NUM_AC3", "not-a-number");
        let err = parse_env::<f64>("TEST_NUM_AC3", 1.0).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { key: "TEST_NUM_AC3", .. }));
        std::env::remove_var("TEST_NUM_AC3");
    }

    /// A representative config for tests elsewhere in the crate.
    pub fn default_cfg() -> ArbConfig {
        ArbConfig {
            timeframe: "D".into(),
            symbols_to_test: vec![],
            formation_period_days: 252,
            pair_recalc_period_days: 30,
            rolling_window: 60,
            corr_threshold: 0.90,
            adf_p: 0.01,
            min_half_life: 5.0,
            max_half_life: 100.0,
            z_entry: 2.5,
            z_exit: 0.5,
            z_stop: 3.0,
            time_stop_factor: 2.5,
            initial_capital: 1_000_000.0,
            max_concurrent_pairs: 10,
            trade_notional_per_pair: 100_000.0,
            fixed_theoretical_notional: 10_000.0,
            transaction_cost_bps: 5.0,
            annual_borrow_cost_percent: 1.5,
            output_file_name: "trade_log.csv".into(),
            data_dir: "data".into(),
            cycle_interval_seconds: 900,
            client_id: None,
            access_token: None,
        }
    }
}
