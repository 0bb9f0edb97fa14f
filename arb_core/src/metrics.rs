/// metrics.rs — Performance Metrics
///
/// ─────────────────────────────────────────────────────────────────────────
/// MATHEMATICAL SPECIFICATION
/// ─────────────────────────────────────────────────────────────────────────
///
/// SHARPE RATIO (annualised)
///   Used for: overall risk-adjusted return, treating each closed trade as
///   one independent return observation.
///
///   r̄  = mean(per-trade net return fraction)
///   σ_r = std(per-trade net return fraction)
///   SR  = (r̄ − r_f) / σ_r × √N_annual
///
///   where r_f = risk-free rate (0), N_annual = trades per year implied by
///   the average holding period.
///
/// SORTINO RATIO (annualised)
///   Used for: penalises only DOWNSIDE volatility
///
///   σ_d = √(mean(min(r_t, 0)²))   (downside deviation)
///   SoR = (r̄ − r_f) / σ_d × √N_annual
///
/// MAXIMUM DRAWDOWN
///   Equity curve: E_t (cumulative net PnL, one point per closed trade)
///   Running peak: peak_t = max_{s ≤ t}(E_s)
///   Drawdown at t: DD_t = (E_t − peak_t) / peak_t
///   MaxDD = min_t(DD_t)   (most negative)
///
/// CALMAR RATIO
///   Calmar = total_return / |MaxDD|
///
/// WIN RATE, MECHANICAL WIN RATE & PROFIT FACTOR
///   P_win  = count(net_pnl > 0) / N_trades
///   Mechanical win rate = TP hits / (TP hits + SL hits), excluding TIME STOP
///   exits — isolates the statistical edge from the bars-held cutoff.
///   Profit Factor = sum(winning net_pnl) / |sum(losing net_pnl)|
/// ─────────────────────────────────────────────────────────────────────────
use crate::backtest::ClosedTrade;
use ahash::AHashMap;

/// Complete backtest performance report for one portfolio (realistic or
/// theoretical — §4.G runs both and reports each through this type).
#[derive(Debug, Clone)]
pub struct PerfReport {
    pub n_trades: usize,
    pub win_rate: f64,
    pub mechanical_win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub total_return: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub max_drawdown: f64,
    pub calmar: f64,
    pub initial_equity: f64,
    pub final_equity: f64,
    pub by_exit_reason: Vec<(String, u32, f64)>,
}

impl std::fmt::Display for PerfReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "════════════════════════════════════════════")?;
        writeln!(f, "  PAIRS ARBITRAGE — BACKTEST PERFORMANCE REPORT")?;
        writeln!(f, "════════════════════════════════════════════")?;
        writeln!(f, "  Trades               : {}", self.n_trades)?;
        writeln!(f, "  Win Rate             : {:.2}%", self.win_rate * 100.0)?;
        writeln!(f, "  Mechanical Win Rate  : {:.2}%", self.mechanical_win_rate * 100.0)?;
        writeln!(f, "  Avg Win              : {:.2}", self.avg_win)?;
        writeln!(f, "  Avg Loss             : {:.2}", self.avg_loss)?;
        writeln!(f, "  Profit Factor        : {:.3}", self.profit_factor)?;
        writeln!(f, "  Total Return         : {:.2}%", self.total_return * 100.0)?;
        writeln!(f, "  Sharpe Ratio         : {:.3}", self.sharpe)?;
        writeln!(f, "  Sortino Ratio        : {:.3}", self.sortino)?;
        writeln!(f, "  Max Drawdown         : {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "  Calmar Ratio         : {:.3}", self.calmar)?;
        writeln!(f, "  Initial Equity       : {:.2}", self.initial_equity)?;
        writeln!(f, "  Final Equity         : {:.2}", self.final_equity)?;
        for (reason, count, pnl) in &self.by_exit_reason {
            writeln!(f, "    {:<18} n={:<5} net_pnl={:.2}", reason, count, pnl)?;
        }
        writeln!(f, "════════════════════════════════════════════")
    }
}

/// Compute all performance metrics from a portfolio's closed trades.
///
/// `bars_per_year` is the annualisation factor for the Sharpe/Sortino scale
/// term — for daily bars this is ~252, for the live-cycle cadence it should
/// be derived from `cycle_interval_seconds` by the caller.
pub fn compute_metrics(trades: &[ClosedTrade], initial_equity: f64, bars_per_year: f64) -> PerfReport {
    let n = trades.len();
    if n == 0 {
        return PerfReport {
            n_trades: 0,
            win_rate: 0.0,
            mechanical_win_rate: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            profit_factor: 0.0,
            total_return: 0.0,
            sharpe: 0.0,
            sortino: 0.0,
            max_drawdown: 0.0,
            calmar: 0.0,
            initial_equity,
            final_equity: initial_equity,
            by_exit_reason: vec![],
        };
    }

    let returns: Vec<f64> = trades.iter().map(|t| t.net_pnl).collect();
    let winners: Vec<f64> = returns.iter().filter(|&&r| r > 0.0).cloned().collect();
    let losers: Vec<f64> = returns.iter().filter(|&&r| r <= 0.0).cloned().collect();

    let win_rate = winners.len() as f64 / n as f64;
    let avg_win = mean(&winners).unwrap_or(0.0);
    let avg_loss = mean(&losers.iter().map(|x| x.abs()).collect::<Vec<_>>()).unwrap_or(0.0);

    let gross_win: f64 = winners.iter().sum();
    let gross_loss: f64 = losers.iter().map(|x| x.abs()).sum();
    let profit_factor = if gross_loss < 1e-10 { f64::INFINITY } else { gross_win / gross_loss };

    let final_equity = initial_equity + returns.iter().sum::<f64>();
    let total_return = (final_equity - initial_equity) / initial_equity;

    let r_mean = mean(&returns).unwrap_or(0.0);
    let r_std = std_dev(&returns);
    let scale = (bars_per_year / n as f64).sqrt();
    let sharpe = if r_std < 1e-12 { 0.0 } else { (r_mean / r_std) * scale };

    let downside_sq: Vec<f64> = returns.iter().map(|&r| if r < 0.0 { r * r } else { 0.0 }).collect();
    let sigma_d = mean(&downside_sq).unwrap_or(0.0).sqrt();
    let sortino = if sigma_d < 1e-12 { f64::INFINITY } else { (r_mean / sigma_d) * scale };

    let equity_curve: Vec<f64> = std::iter::once(initial_equity)
        .chain(returns.iter().scan(initial_equity, |acc, r| {
            *acc += r;
            Some(*acc)
        }))
        .collect();
    let mdd = max_drawdown(&equity_curve);
    let calmar = if mdd.abs() < 1e-10 { f64::INFINITY } else { total_return / mdd.abs() };

    let mut by_reason: AHashMap<String, (u32, f64)> = AHashMap::new();
    for t in trades {
        let e = by_reason.entry(t.exit_reason.clone()).or_insert((0, 0.0));
        e.0 += 1;
        e.1 += t.net_pnl;
    }
    let mut by_exit_reason: Vec<(String, u32, f64)> = by_reason.into_iter().map(|(k, (c, p))| (k, c, p)).collect();
    by_exit_reason.sort_by(|a, b| a.0.cmp(&b.0));

    let tp_hits = by_exit_reason.iter().find(|(r, ..)| r == "PROFIT TARGET").map(|(_, c, _)| *c).unwrap_or(0);
    let sl_hits = by_exit_reason.iter().find(|(r, ..)| r == "STATISTICAL STOP").map(|(_, c, _)| *c).unwrap_or(0);
    let mechanical_win_rate = if tp_hits + sl_hits == 0 { 0.0 } else { tp_hits as f64 / (tp_hits + sl_hits) as f64 };

    PerfReport {
        n_trades: n,
        win_rate,
        mechanical_win_rate,
        avg_win,
        avg_loss,
        profit_factor,
        total_return,
        sharpe,
        sortino,
        max_drawdown: mdd,
        calmar,
        initial_equity,
        final_equity,
        by_exit_reason,
    }
}

/// Maximum drawdown from an equity curve. Returns a negative value.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.is_empty() {
        return 0.0;
    }
    let mut peak = equity_curve[0];
    let mut max_dd = 0.0f64;
    for &e in equity_curve {
        if e > peak {
            peak = e;
        }
        let dd = (e - peak) / peak;
        if dd < max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = data.iter().sum::<f64>() / data.len() as f64;
    let var = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal_engine::Direction;

    fn trade(net_pnl: f64, reason: &str) -> ClosedTrade {
        ClosedTrade {
            serial_number: 1,
            pair: "A_B".into(),
            direction: Direction::Long,
            entry_timestamp: 0,
            exit_timestamp: 86_400,
            days_held: 1,
            z_score_entry: 2.6,
            z_score_exit: 0.4,
            exit_reason: reason.to_string(),
            s1_symbol: "A".into(),
            s1_entry_price: 100.0,
            s1_qty: 10,
            s2_symbol: "B".into(),
            s2_entry_price: 50.0,
            s2_qty: 20,
            gross_pnl: net_pnl,
            transaction_costs: 0.0,
            borrow_costs: 0.0,
            net_pnl,
            hedge_ratio: (0.0, 1.0),
            half_life: 10.0,
        }
    }

    #[test]
    fn max_drawdown_flat() {
        let curve = vec![100.0, 100.0, 100.0];
        assert_eq!(max_drawdown(&curve), 0.0);
    }

    #[test]
    fn max_drawdown_50_pct() {
        let curve = vec![100.0, 120.0, 60.0, 80.0];
        let dd = max_drawdown(&curve);
        assert!((dd + 0.5).abs() < 1e-9, "dd = {dd}");
    }

    #[test]
    fn empty_trades_report_is_inert() {
        let report = compute_metrics(&[], 1000.0, 252.0);
        assert_eq!(report.n_trades, 0);
        assert_eq!(report.final_equity, 1000.0);
    }

    #[test]
    fn profit_factor_and_mechanical_win_rate() {
        let trades = vec![
            trade(10.0, "PROFIT TARGET"),
            trade(10.0, "PROFIT TARGET"),
            trade(-5.0, "STATISTICAL STOP"),
            trade(-2.0, "TIME STOP"),
        ];
        let report = compute_metrics(&trades, 1000.0, 252.0);
        assert_eq!(report.n_trades, 4);
        assert!((report.profit_factor - (20.0 / 7.0)).abs() < 1e-9);
        assert!((report.mechanical_win_rate - (2.0 / 3.0)).abs() < 1e-9);
        assert!((report.final_equity - 1013.0).abs() < 1e-9);
    }
}
