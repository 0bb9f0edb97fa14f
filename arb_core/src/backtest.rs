/// backtest.rs — Portfolio Backtest Driver (§4.G)
///
/// Replays an aligned bar history bar by bar, maintaining two independent
/// portfolios side by side — realistic (capped concurrency, real sizing) and
/// theoretical (uncapped, fixed small notional, for measuring signal quality
/// in isolation from capital constraints) — and produces a trade log plus
/// summary report for each.
///
/// ARCHITECTURE
/// ┌─────────────────────────────────────────────────────┐
/// │  AlignedBarMatrix (closes + next-bar opens)          │
/// │        │                                             │
/// │   every `pair_recalc_period_days` bars:               │
/// │        find_cointegrated_pairs() → StrategyCache      │
/// │        │                                             │
/// │   every bar, per pair in play:                        │
/// │        signal_engine::signal() → EXIT (if open)       │
/// │        signal_engine::signal() → ENTER (if flat)       │
/// │        │                                             │
/// │   open_position() / close_position() on next bar's    │
/// │   open price, against realistic AND theoretical books │
/// └─────────────────────────────────────────────────────┘
use crate::cache::StrategyCache;
use crate::candle::AlignedBarMatrix;
use crate::config::ArbConfig;
use crate::pair_finder::{find_cointegrated_pairs, PairInfo};
use crate::signal_engine::{self, Direction, OpenPosition, SignalType};
use ahash::AHashMap;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ClosedTrade {
    pub serial_number: u32,
    pub pair: String,
    pub direction: Direction,
    pub entry_timestamp: i64,
    pub exit_timestamp: i64,
    pub days_held: i64,
    pub z_score_entry: f64,
    pub z_score_exit: f64,
    pub exit_reason: String,
    pub s1_symbol: String,
    pub s1_entry_price: f64,
    pub s1_qty: i64,
    pub s2_symbol: String,
    pub s2_entry_price: f64,
    pub s2_qty: i64,
    pub gross_pnl: f64,
    pub transaction_costs: f64,
    pub borrow_costs: f64,
    pub net_pnl: f64,
    pub hedge_ratio: (f64, f64),
    pub half_life: f64,
}

impl ClosedTrade {
    pub fn s1_position(&self) -> &'static str {
        match self.direction {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }

    pub fn s2_position(&self) -> &'static str {
        match self.direction {
            Direction::Long => "SHORT",
            Direction::Short => "LONG",
        }
    }

    /// Renders one CSV row matching the trade-log schema exactly.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{:?},{},{},{},{:.4},{:.4},{},{},{},{:.4},{},{},{},{:.4},{},{:.4},{:.4},{:.4},{:.4},{:.6},{:.4}",
            self.serial_number,
            self.pair,
            self.direction,
            self.entry_timestamp,
            self.exit_timestamp,
            self.days_held,
            self.z_score_entry,
            self.z_score_exit,
            self.exit_reason,
            self.s1_symbol,
            self.s1_position(),
            self.s1_entry_price,
            self.s1_qty,
            self.s2_symbol,
            self.s2_position(),
            self.s2_entry_price,
            self.s2_qty,
            self.gross_pnl,
            self.transaction_costs,
            self.borrow_costs,
            self.net_pnl,
            self.hedge_ratio.1,
            self.half_life,
        )
    }

    pub fn csv_header() -> &'static str {
        "serial_number,pair,direction,entry_timestamp,exit_timestamp,days_held,z_score_entry,z_score_exit,exit_reason,s1_symbol,s1_pos,s1_entry_price,s1_qty,s2_symbol,s2_pos,s2_entry_price,s2_qty,gross_pnl,transaction_costs,borrow_costs,net_pnl,hedge_ratio,half_life"
    }
}

struct PositionRecord {
    s1: String,
    s2: String,
    position: OpenPosition,
}

struct Portfolio {
    name: &'static str,
    capital: f64,
    initial_capital: f64,
    max_concurrent: Option<usize>,
    notional_per_pair: f64,
    open: AHashMap<String, PositionRecord>,
    closed: Vec<ClosedTrade>,
    skipped_for_capacity: u32,
    next_serial: u32,
}

impl Portfolio {
    fn new(name: &'static str, initial_capital: f64, max_concurrent: Option<usize>, notional_per_pair: f64) -> Self {
        Self {
            name,
            capital: initial_capital,
            initial_capital,
            max_concurrent,
            notional_per_pair,
            open: AHashMap::new(),
            closed: Vec::new(),
            skipped_for_capacity: 0,
            next_serial: 1,
        }
    }

    fn has_capacity(&self) -> bool {
        self.max_concurrent.map(|cap| self.open.len() < cap).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioReport {
    pub n_trades: usize,
    pub final_capital: f64,
    pub net_pnl: f64,
    pub win_rate: f64,
    pub by_exit_reason: Vec<(String, u32, f64)>,
    pub mechanical_win_rate: f64,
    pub skipped_for_capacity: u32,
}

pub struct BacktestOutput {
    pub realistic_trades: Vec<ClosedTrade>,
    pub theoretical_trades: Vec<ClosedTrade>,
    pub realistic_report: PortfolioReport,
    pub theoretical_report: PortfolioReport,
}

/// Runs the full two-portfolio backtest over `matrix` using `cfg`'s
/// formation/recalc/rolling-window/threshold settings.
pub fn run_backtest(matrix: &AlignedBarMatrix, cfg: &ArbConfig) -> BacktestOutput {
    let formation = cfg.formation_period_days;
    let recalc_period = cfg.pair_recalc_period_days.max(1);
    let rolling = cfg.rolling_window;
    let last = matrix.num_rows();

    info!("═══════════════════════════════════════════════");
    info!("  PAIRS BACKTEST — {} bars, formation={}", last, formation);
    info!("═══════════════════════════════════════════════");

    let mut realistic = Portfolio::new("realistic", cfg.initial_capital, Some(cfg.max_concurrent_pairs), cfg.trade_notional_per_pair);
    let mut theoretical = Portfolio::new("theoretical", cfg.initial_capital, None, cfg.fixed_theoretical_notional);

    let cache = StrategyCache::new();

    if last <= formation + 1 {
        return BacktestOutput {
            realistic_trades: vec![],
            theoretical_trades: vec![],
            realistic_report: summarize(&realistic),
            theoretical_report: summarize(&theoretical),
        };
    }

    let close_view = matrix.as_close_matrix();

    for i in formation..last - 1 {
        if (i - formation) % recalc_period == 0 {
            let window = close_view.slice_rows(i.saturating_sub(formation), i);
            let admitted = find_cointegrated_pairs(&window, cfg);
            cache.refresh(admitted, i as i64);
        }

        if i + 1 < rolling + 1 {
            continue;
        }

        let snapshot = cache.snapshot();
        let mut pairs_in_play: Vec<PairInfo> = snapshot.admitted_pairs.clone();
        for rec in realistic.open.values().chain(theoretical.open.values()) {
            let key = format!("{}_{}", rec.s1, rec.s2);
            if !pairs_in_play.iter().any(|p| p.key() == key) {
                pairs_in_play.push(PairInfo {
                    s1: rec.s1.clone(),
                    s2: rec.s2.clone(),
                    half_life: rec.position.half_life,
                    alpha: rec.position.hedge_ratio.0,
                    beta: rec.position.hedge_ratio.1,
                });
            }
        }
        pairs_in_play.sort_by(|a, b| (a.s1.as_str(), a.s2.as_str()).cmp(&(b.s1.as_str(), b.s2.as_str())));

        let slice_len = rolling + 1;
        for pair in &pairs_in_play {
            let (Some(c1), Some(c2)) = (matrix.column_index(&pair.s1), matrix.column_index(&pair.s2)) else {
                continue;
            };
            let log_p1: Vec<f64> = matrix.closes[c1][i + 1 - slice_len..=i].iter().map(|p| p.ln()).collect();
            let log_p2: Vec<f64> = matrix.closes[c2][i + 1 - slice_len..=i].iter().map(|p| p.ln()).collect();

            step_portfolio(&mut realistic, pair, &log_p1, &log_p2, rolling, cfg, matrix, i);
            step_portfolio(&mut theoretical, pair, &log_p1, &log_p2, rolling, cfg, matrix, i);
        }
    }

    let realistic_report = summarize(&realistic);
    let theoretical_report = summarize(&theoretical);
    info!("realistic portfolio: {} trades, net_pnl={:.2}", realistic_report.n_trades, realistic_report.net_pnl);
    info!("theoretical portfolio: {} trades, net_pnl={:.2}", theoretical_report.n_trades, theoretical_report.net_pnl);

    BacktestOutput {
        realistic_trades: realistic.closed.clone(),
        theoretical_trades: theoretical.closed.clone(),
        realistic_report,
        theoretical_report,
    }
}

#[allow(clippy::too_many_arguments)]
fn step_portfolio(
    portfolio: &mut Portfolio,
    pair: &PairInfo,
    log_p1: &[f64],
    log_p2: &[f64],
    rolling: usize,
    cfg: &ArbConfig,
    matrix: &AlignedBarMatrix,
    bar: usize,
) {
    let key = pair.key();

    // EXIT evaluated first, against the position currently open (if any).
    if let Some(rec) = portfolio.open.get(&key) {
        if let Some(sig) = signal_engine::signal(
            &key, log_p1, log_p2, pair, Some(&rec.position), rolling,
            cfg.z_entry, cfg.z_exit, cfg.z_stop, cfg.time_stop_factor,
        ) {
            match sig.signal_type {
                SignalType::ExitLong | SignalType::ExitShort => {
                    close_position(portfolio, &key, sig.z_score, &sig.reason, cfg, matrix, bar);
                }
                _ => {
                    if let Some(rec) = portfolio.open.get_mut(&key) {
                        rec.position.bars_held += 1;
                    }
                }
            }
        }
    }

    // ENTER next, only if still flat after the exit check above.
    if !portfolio.open.contains_key(&key) {
        if let Some(sig) = signal_engine::signal(
            &key, log_p1, log_p2, pair, None, rolling,
            cfg.z_entry, cfg.z_exit, cfg.z_stop, cfg.time_stop_factor,
        ) {
            if matches!(sig.signal_type, SignalType::EnterLong | SignalType::EnterShort) {
                open_position(portfolio, pair, &sig, matrix, bar);
            }
        }
    }
}

fn open_position(
    portfolio: &mut Portfolio,
    pair: &PairInfo,
    sig: &signal_engine::PairSignal,
    matrix: &AlignedBarMatrix,
    bar: usize,
) {
    if !portfolio.has_capacity() {
        portfolio.skipped_for_capacity += 1;
        return;
    }
    let (Some(c1), Some(c2)) = (matrix.column_index(&pair.s1), matrix.column_index(&pair.s2)) else {
        return;
    };
    // Next-bar open-price execution.
    let entry_price_s1 = matrix.opens[c1][bar + 1];
    let entry_price_s2 = matrix.opens[c2][bar + 1];

    let beta_abs = pair.beta.abs();
    let notional = portfolio.notional_per_pair;
    let notional_s1 = notional / (1.0 + beta_abs);
    let notional_s2 = notional * beta_abs / (1.0 + beta_abs);
    let qty_s1 = (notional_s1 / entry_price_s1).floor() as i64;
    let qty_s2 = (notional_s2 / entry_price_s2).floor() as i64;
    if qty_s1 == 0 || qty_s2 == 0 {
        return;
    }

    let direction = match sig.signal_type {
        SignalType::EnterLong => Direction::Long,
        SignalType::EnterShort => Direction::Short,
        _ => return,
    };

    portfolio.open.insert(
        pair.key(),
        PositionRecord {
            s1: pair.s1.clone(),
            s2: pair.s2.clone(),
            position: OpenPosition {
                direction,
                entry_timestamp: matrix.timestamps[bar + 1],
                entry_candle_index: bar + 1,
                entry_price_s1,
                entry_price_s2,
                qty_s1,
                qty_s2,
                z_score_entry: sig.z_score,
                hedge_ratio: sig.hedge_ratio,
                half_life: pair.half_life,
                bars_held: 0,
            },
        },
    );
}

fn close_position(
    portfolio: &mut Portfolio,
    key: &str,
    z_score_exit: f64,
    exit_reason: &str,
    cfg: &ArbConfig,
    matrix: &AlignedBarMatrix,
    bar: usize,
) {
    let Some(rec) = portfolio.open.remove(key) else { return };
    let pos = rec.position;
    let (Some(c1), Some(c2)) = (matrix.column_index(&rec.s1), matrix.column_index(&rec.s2)) else {
        return;
    };
    let exit_price_s1 = matrix.opens[c1][bar + 1];
    let exit_price_s2 = matrix.opens[c2][bar + 1];

    // LONG means long s1 / short s2; SHORT is the mirror.
    let (sign_s1, sign_s2) = match pos.direction {
        Direction::Long => (1.0, -1.0),
        Direction::Short => (-1.0, 1.0),
    };
    let pnl_s1 = sign_s1 * (exit_price_s1 - pos.entry_price_s1) * pos.qty_s1 as f64;
    let pnl_s2 = sign_s2 * (exit_price_s2 - pos.entry_price_s2) * pos.qty_s2 as f64;
    let gross_pnl = pnl_s1 + pnl_s2;

    let turnover = pos.entry_price_s1 * pos.qty_s1 as f64
        + pos.entry_price_s2 * pos.qty_s2 as f64
        + exit_price_s1 * pos.qty_s1 as f64
        + exit_price_s2 * pos.qty_s2 as f64;
    let transaction_costs = turnover * cfg.transaction_cost_bps / 10_000.0;

    let short_leg_notional = match pos.direction {
        Direction::Long => pos.entry_price_s2 * pos.qty_s2 as f64,
        Direction::Short => pos.entry_price_s1 * pos.qty_s1 as f64,
    };
    let entry_ts = pos.entry_timestamp;
    let exit_ts = matrix.timestamps[bar + 1];
    let days_held = ((exit_ts - entry_ts) / 86_400).max(0);
    let borrow_costs = short_leg_notional * (cfg.annual_borrow_cost_percent / 100.0) * days_held as f64 / 365.0;

    let net_pnl = gross_pnl - transaction_costs - borrow_costs;
    portfolio.capital += net_pnl;

    let serial = portfolio.next_serial;
    portfolio.next_serial += 1;

    if net_pnl.is_nan() {
        tracing::warn!(pair = key, portfolio = portfolio.name, "NaN pnl on close, dropping trade");
        return;
    }

    portfolio.closed.push(ClosedTrade {
        serial_number: serial,
        pair: key.to_string(),
        direction: pos.direction,
        entry_timestamp: entry_ts,
        exit_timestamp: exit_ts,
        days_held,
        z_score_entry: pos.z_score_entry,
        z_score_exit,
        exit_reason: exit_reason.to_string(),
        s1_symbol: rec.s1,
        s1_entry_price: pos.entry_price_s1,
        s1_qty: pos.qty_s1,
        s2_symbol: rec.s2,
        s2_entry_price: pos.entry_price_s2,
        s2_qty: pos.qty_s2,
        gross_pnl,
        transaction_costs,
        borrow_costs,
        net_pnl,
        hedge_ratio: pos.hedge_ratio,
        half_life: pos.half_life,
    });
}

fn summarize(portfolio: &Portfolio) -> PortfolioReport {
    let n = portfolio.closed.len();
    if n == 0 {
        return PortfolioReport {
            n_trades: 0,
            final_capital: portfolio.capital,
            net_pnl: portfolio.capital - portfolio.initial_capital,
            win_rate: 0.0,
            by_exit_reason: vec![],
            mechanical_win_rate: 0.0,
            skipped_for_capacity: portfolio.skipped_for_capacity,
        };
    }

    let wins = portfolio.closed.iter().filter(|t| t.net_pnl > 0.0).count();
    let win_rate = wins as f64 / n as f64;

    let mut by_reason: AHashMap<String, (u32, f64)> = AHashMap::new();
    for t in &portfolio.closed {
        let entry = by_reason.entry(t.exit_reason.clone()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += t.net_pnl;
    }
    let mut by_exit_reason: Vec<(String, u32, f64)> = by_reason.into_iter().map(|(k, (c, p))| (k, c, p)).collect();
    by_exit_reason.sort_by(|a, b| a.0.cmp(&b.0));

    // "Mechanical" win rate per §8: the TP/(TP+SL) ratio, ignoring TIME STOP
    // exits — it isolates the statistical edge from the bars-held cutoff.
    let tp_hits = by_exit_reason.iter().find(|(r, ..)| r == "PROFIT TARGET").map(|(_, c, _)| *c).unwrap_or(0);
    let sl_hits = by_exit_reason.iter().find(|(r, ..)| r == "STATISTICAL STOP").map(|(_, c, _)| *c).unwrap_or(0);
    let mechanical_win_rate = if tp_hits + sl_hits == 0 {
        0.0
    } else {
        tp_hits as f64 / (tp_hits + sl_hits) as f64
    };

    PortfolioReport {
        n_trades: n,
        final_capital: portfolio.capital,
        net_pnl: portfolio.capital - portfolio.initial_capital,
        win_rate,
        by_exit_reason,
        mechanical_win_rate,
        skipped_for_capacity: portfolio.skipped_for_capacity,
    }
}

impl std::fmt::Display for PortfolioReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  Trades               : {}", self.n_trades)?;
        writeln!(f, "  Final Capital        : {:.2}", self.final_capital)?;
        writeln!(f, "  Net PnL              : {:.2}", self.net_pnl)?;
        writeln!(f, "  Win Rate             : {:.2}%", self.win_rate * 100.0)?;
        writeln!(f, "  Mechanical Win Rate  : {:.2}%", self.mechanical_win_rate * 100.0)?;
        writeln!(f, "  Skipped (capacity)   : {}", self.skipped_for_capacity)?;
        for (reason, count, pnl) in &self.by_exit_reason {
            writeln!(f, "    {:<18} n={:<5} net_pnl={:.2}", reason, count, pnl)?;
        }
        Ok(())
    }
}

/// Prints the realistic and theoretical reports side by side, in the
/// dual-portfolio summary shape called for by the trading-session writeup.
pub fn print_dual_report(output: &BacktestOutput) {
    println!("\n=== REALISTIC PORTFOLIO ===");
    println!("{}", output.realistic_report);
    println!("=== THEORETICAL PORTFOLIO ===");
    println!("{}", output.theoretical_report);
}

/// Writes the combined trade log (realistic book) to `path` in the CSV
/// schema every downstream report consumer expects.
pub fn write_trade_log_csv(trades: &[ClosedTrade], path: &str) -> std::io::Result<()> {
    use std::io::Write;
    let mut f = std::fs::File::create(path)?;
    writeln!(f, "{}", ClosedTrade::csv_header())?;
    for t in trades {
        writeln!(f, "{}", t.to_csv_row())?;
    }
    Ok(())
}
