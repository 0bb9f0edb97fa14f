/// live_main.rs — Live Trading Entry Point (§4.F)
///
/// Polls the configured symbol universe at `cycle_interval_seconds`
/// cadence, recalculates the admitted pair set on its own slower cadence
/// via the shared `StrategyCache`, and emits a signal-engine decision plus
/// (for ENTER signals) a price plan for every admitted pair still in view.
/// This driver is informational only: the signal engine is always called
/// with `open_position = None` (§4.F.3) — it never tracks position state
/// itself. Placing the resulting orders against a broker, and reconciling
/// them back into position state, is out of scope (§9 design note) and
/// belongs to a downstream order system; this driver's job ends at the
/// structured log lines that system would consume.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arb_core::candle::Timeframe;
use arb_core::signal_engine::rolling_spread_stats;
use arb_core::{find_cointegrated_pairs, price_plan, signal, ArbConfig, CsvBarFetcher, PriceStore, SignalType, StrategyCache};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("=== statistical arbitrage live driver ===");

    let cfg = ArbConfig::from_env().context("loading configuration")?;
    if cfg.symbols_to_test.len() < 2 {
        bail!("SYMBOLS_TO_TEST must list at least two symbols");
    }
    let timeframe = Timeframe::parse(&cfg.timeframe)
        .with_context(|| format!("unrecognized TIMEFRAME {:?}", cfg.timeframe))?;

    let mut store = PriceStore::new(CsvBarFetcher::new(cfg.data_dir.clone()));
    let cache = StrategyCache::new();
    let recalc_interval_secs = cfg.pair_recalc_period_days as i64 * 86_400;
    let tail_length = cfg.formation_period_days + cfg.rolling_window;

    info!(
        symbols = cfg.symbols_to_test.len(),
        recalc_interval_secs, cycle_interval_seconds = cfg.cycle_interval_seconds,
        "entering live loop"
    );

    loop {
        let now = chrono::Utc::now().timestamp();

        let matrix = match store.align_close(&cfg.symbols_to_test, timeframe, tail_length) {
            Ok(m) => m,
            Err(err) => {
                warn!(%err, "failed to build aligned close matrix this cycle");
                if !sleep_or_shutdown(cfg.cycle_interval_seconds).await {
                    break;
                }
                continue;
            }
        };

        if cache.is_stale(now, recalc_interval_secs) {
            let admitted = find_cointegrated_pairs(&matrix, &cfg);
            info!(admitted = admitted.len(), "pair universe recalculated");
            cache.refresh(admitted, now);
        }

        let snapshot = cache.snapshot();
        for pair in snapshot.admitted_pairs.iter() {
            let (Some(i1), Some(i2)) = (matrix.column_index(&pair.s1), matrix.column_index(&pair.s2)) else {
                continue;
            };
            let log_p1: Vec<f64> = matrix.closes[i1].iter().map(|p| p.ln()).collect();
            let log_p2: Vec<f64> = matrix.closes[i2].iter().map(|p| p.ln()).collect();

            // Informational only (§4.F.3): always evaluated from FLAT. This
            // driver never tracks position state — that is a downstream
            // order system's job, outside this core's contract.
            let Some(sig) = signal(
                &pair.key(),
                &log_p1,
                &log_p2,
                pair,
                None,
                cfg.rolling_window,
                cfg.z_entry,
                cfg.z_exit,
                cfg.z_stop,
                cfg.time_stop_factor,
            ) else {
                continue;
            };

            info!(pair = %sig.pair, signal = ?sig.signal_type, reason = %sig.reason, z = sig.z_score, "signal");

            if matches!(sig.signal_type, SignalType::EnterLong | SignalType::EnterShort) {
                if let Some((alpha, beta, mu, sigma)) = rolling_spread_stats(&log_p1, &log_p2, cfg.rolling_window) {
                    if let Some(plan) = price_plan(
                        sig.signal_type,
                        alpha,
                        beta,
                        mu,
                        sigma,
                        cfg.z_exit,
                        cfg.z_stop,
                        *log_p1.last().expect("non-empty by signal() precondition"),
                        *log_p2.last().expect("non-empty by signal() precondition"),
                    ) {
                        info!(
                            pair = %sig.pair,
                            target_s1 = plan.target_price_s1,
                            stop_s1 = plan.stop_price_s1,
                            target_s2 = plan.target_price_s2,
                            stop_s2 = plan.stop_price_s2,
                            "price plan"
                        );
                    }
                }
            }
        }

        if !sleep_or_shutdown(cfg.cycle_interval_seconds).await {
            info!("shutdown signal received, exiting live loop");
            break;
        }
    }

    Ok(())
}

/// Sleeps for `secs` seconds, returning early with `false` if a Ctrl-C
/// arrives first — keeps the live loop interruptible instead of riding out
/// a full cycle before it notices a shutdown request.
async fn sleep_or_shutdown(secs: u64) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(tokio::time::Duration::from_secs(secs)) => true,
        _ = tokio::signal::ctrl_c() => false,
    }
}
