/// main.rs — Backtest Entry Point (§4.G)
///
/// Runs the full statistical-arbitrage backtest over a CSV-backed universe:
///   1. Load config from .env
///   2. Load each symbol's candle history from the local data directory
///   3. Align into one bar matrix and run the dual-portfolio backtest
///   4. Print both portfolio reports and the derived performance metrics
///   5. Write the realistic book's trade log to disk

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use arb_core::candle::{AlignedBarMatrix, PriceTable, Timeframe};
use arb_core::{compute_metrics, print_dual_report, run_backtest, write_trade_log_csv, ArbConfig, BarFetcher, CsvBarFetcher};

/// Bars-per-year annualisation factor for each timeframe, used to scale
/// Sharpe/Sortino from per-trade to annual terms (§10 metrics convention).
fn bars_per_year(timeframe: &Timeframe) -> f64 {
    match timeframe {
        Timeframe::Minutes(1) => 525_600.0,
        Timeframe::Minutes(5) => 105_120.0,
        Timeframe::Minutes(15) => 35_040.0,
        Timeframe::Minutes(30) => 17_520.0,
        Timeframe::Minutes(60) => 8_760.0,
        Timeframe::Minutes(240) => 2_190.0,
        Timeframe::Minutes(n) => 525_600.0 / (*n as f64),
        Timeframe::Daily => 252.0,
        Timeframe::Weekly => 52.0,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("=== statistical arbitrage backtest ===");

    let cfg = ArbConfig::from_env().context("loading configuration")?;
    if cfg.symbols_to_test.len() < 2 {
        bail!("SYMBOLS_TO_TEST must list at least two symbols");
    }
    let timeframe = Timeframe::parse(&cfg.timeframe)
        .with_context(|| format!("unrecognized TIMEFRAME {:?}", cfg.timeframe))?;

    info!(
        symbols = cfg.symbols_to_test.len(),
        timeframe = %cfg.timeframe,
        formation_days = cfg.formation_period_days,
        recalc_days = cfg.pair_recalc_period_days,
        "config loaded"
    );

    let fetcher = CsvBarFetcher::new(cfg.data_dir.clone());
    let num_candles = cfg.formation_period_days + cfg.pair_recalc_period_days * 12;

    let mut tables = Vec::with_capacity(cfg.symbols_to_test.len());
    for symbol in &cfg.symbols_to_test {
        let candles = fetcher.fetch(symbol, timeframe, num_candles);
        if candles.is_empty() {
            bail!("no candle data found for {symbol} in {}", cfg.data_dir);
        }
        info!(symbol = %symbol, bars = candles.len(), "loaded candle history");
        tables.push((symbol.clone(), PriceTable::from_candles(candles)));
    }

    let table_refs: Vec<(&str, &PriceTable)> = tables.iter().map(|(s, t)| (s.as_str(), t)).collect();
    let matrix = AlignedBarMatrix::align(&table_refs);
    if matrix.num_rows() < cfg.formation_period_days + 2 {
        bail!(
            "aligned history too short: got {} rows, need at least {}",
            matrix.num_rows(),
            cfg.formation_period_days + 2
        );
    }
    info!(rows = matrix.num_rows(), "aligned bar matrix built");

    let output = run_backtest(&matrix, &cfg);
    print_dual_report(&output);

    let bpy = bars_per_year(&timeframe);
    let realistic_metrics = compute_metrics(&output.realistic_trades, cfg.initial_capital, bpy);
    let theoretical_metrics = compute_metrics(&output.theoretical_trades, cfg.initial_capital, bpy);
    println!("\n=== REALISTIC METRICS ===\n{realistic_metrics}");
    println!("=== THEORETICAL METRICS ===\n{theoretical_metrics}");

    write_trade_log_csv(&output.realistic_trades, &cfg.output_file_name)
        .with_context(|| format!("writing trade log to {}", cfg.output_file_name))?;
    info!(path = %cfg.output_file_name, "trade log written");

    Ok(())
}
