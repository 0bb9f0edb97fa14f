/// signal_engine.rs — Pair Signal Engine (§4.D)
///
/// Pure function: `signal(...)` takes the pair's price history, its admitted
/// `PairInfo`, and the caller's current `open_position` (or `None` for
/// FLAT), and returns the one `PairSignal` this bar implies — or `None` if
/// the pair should be skipped this bar (not enough history, σ too small, or
/// FLAT with no entry condition met). No state is mutated here; portfolio
/// bookkeeping is the driver's job (§9 design note).
use crate::kernels::ols_bivariate;
use crate::pair_finder::PairInfo;

const SIGMA_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    EnterLong,
    EnterShort,
    ExitLong,
    ExitShort,
    HoldLong,
    HoldShort,
}

/// A pair's open position, as tracked by a driver (backtest portfolio or,
/// in principle, a downstream order system). The signal engine only reads
/// `direction` and `bars_held`; the remaining fields are bookkeeping the
/// driver carries between bars.
#[derive(Debug, Clone)]
pub struct OpenPosition {
    pub direction: Direction,
    pub entry_timestamp: i64,
    pub entry_candle_index: usize,
    pub entry_price_s1: f64,
    pub entry_price_s2: f64,
    pub qty_s1: i64,
    pub qty_s2: i64,
    pub z_score_entry: f64,
    pub hedge_ratio: (f64, f64),
    pub half_life: f64,
    pub bars_held: u32,
}

#[derive(Debug, Clone)]
pub struct PairSignal {
    pub pair: String,
    pub signal_type: SignalType,
    pub reason: String,
    pub z_score: f64,
    pub hedge_ratio: (f64, f64),
    pub half_life: f64,
}

/// Returns `true` iff `signal_type` is a legal emission given `open_position`
/// — ENTER_* only from FLAT (`None`), EXIT_*/HOLD_* only from the matching
/// direction. A violation here is a programmer error (§7's
/// `SignalOrderingViolation`), not a data condition; production code should
/// never be able to trip it, which is why every call site below is paired
/// with a `debug_assert!` rather than a runtime `Result`.
pub fn is_consistent_transition(open_position: Option<&OpenPosition>, signal_type: SignalType) -> bool {
    match (open_position, signal_type) {
        (None, SignalType::EnterLong) | (None, SignalType::EnterShort) => true,
        (Some(p), SignalType::ExitLong) | (Some(p), SignalType::HoldLong) => p.direction == Direction::Long,
        (Some(p), SignalType::ExitShort) | (Some(p), SignalType::HoldShort) => p.direction == Direction::Short,
        _ => false,
    }
}

fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

fn std_dev(data: &[f64], mean_val: f64) -> f64 {
    let var = data.iter().map(|x| (x - mean_val).powi(2)).sum::<f64>() / data.len() as f64;
    var.sqrt()
}

fn time_stop_bars(half_life: f64, time_stop_factor: f64) -> u32 {
    (time_stop_factor * half_life).round().max(0.0) as u32
}

/// Fitted lookback-window spread statistics: dynamic hedge ratio `(α, β)`
/// plus the lookback spread's `(μ, σ)`. This is the same fit `signal()`
/// performs internally (§4.D steps 1–3); exposed so the live driver can
/// invert the spread equation for its ENTER price plan (§4.F.4) without
/// duplicating the regression.
pub fn rolling_spread_stats(log_p1: &[f64], log_p2: &[f64], rolling_window: usize) -> Option<(f64, f64, f64, f64)> {
    if log_p1.len() != log_p2.len() || log_p1.len() < rolling_window + 1 {
        return None;
    }
    let n = log_p1.len();
    let lookback_start = n - 1 - rolling_window;
    let lookback_p1 = &log_p1[lookback_start..n - 1];
    let lookback_p2 = &log_p2[lookback_start..n - 1];

    let fit = ols_bivariate(lookback_p1, lookback_p2).ok()?;
    let (alpha, beta) = (fit.alpha, fit.beta);

    let lookback_spread: Vec<f64> = lookback_p1
        .iter()
        .zip(lookback_p2.iter())
        .map(|(&p1, &p2)| p1 - alpha - beta * p2)
        .collect();
    let mu = mean(&lookback_spread);
    let sigma = std_dev(&lookback_spread, mu);
    Some((alpha, beta, mu, sigma))
}

/// Evaluates the signal engine for one pair on the current bar.
///
/// `log_p1`/`log_p2` must each have length ≥ `rolling_window + 1`, ordered
/// oldest-first with the current bar last. Returns `None` if there isn't
/// enough history or σ is too small to trust a z-score.
#[allow(clippy::too_many_arguments)]
pub fn signal(
    pair_key: &str,
    log_p1: &[f64],
    log_p2: &[f64],
    pair_info: &PairInfo,
    open_position: Option<&OpenPosition>,
    rolling_window: usize,
    z_entry: f64,
    z_exit: f64,
    z_stop: f64,
    time_stop_factor: f64,
) -> Option<PairSignal> {
    let (alpha, beta, mu, sigma) = rolling_spread_stats(log_p1, log_p2, rolling_window)?;
    if sigma < SIGMA_EPS {
        return None;
    }
    let n = log_p1.len();

    let s_current = log_p1[n - 1] - alpha - beta * log_p2[n - 1];
    let z = (s_current - mu) / sigma;

    let (signal_type, reason) = match open_position {
        None => {
            if z > z_entry {
                (SignalType::EnterShort, "Z-Score > Z_ENTRY".to_string())
            } else if z < -z_entry {
                (SignalType::EnterLong, "Z-Score < -Z_ENTRY".to_string())
            } else {
                return None;
            }
        }
        Some(pos) => {
            let time_stop = time_stop_bars(pair_info.half_life, time_stop_factor);
            match pos.direction {
                Direction::Long => {
                    if z.abs() <= z_exit {
                        (SignalType::ExitLong, "PROFIT TARGET".to_string())
                    } else if z <= -z_stop {
                        (SignalType::ExitLong, "STATISTICAL STOP".to_string())
                    } else if pos.bars_held > time_stop {
                        (SignalType::ExitLong, "TIME STOP".to_string())
                    } else {
                        (SignalType::HoldLong, "Position Open".to_string())
                    }
                }
                Direction::Short => {
                    if z.abs() <= z_exit {
                        (SignalType::ExitShort, "PROFIT TARGET".to_string())
                    } else if z >= z_stop {
                        (SignalType::ExitShort, "STATISTICAL STOP".to_string())
                    } else if pos.bars_held > time_stop {
                        (SignalType::ExitShort, "TIME STOP".to_string())
                    } else {
                        (SignalType::HoldShort, "Position Open".to_string())
                    }
                }
            }
        }
    };

    debug_assert!(
        is_consistent_transition(open_position, signal_type),
        "illegal signal transition: {signal_type:?} from {open_position:?}"
    );

    Some(PairSignal {
        pair: pair_key.to_string(),
        signal_type,
        reason,
        z_score: z,
        hedge_ratio: (alpha, beta),
        half_life: pair_info.half_life,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> PairInfo {
        PairInfo { s1: "A".into(), s2: "B".into(), half_life: 20.0, alpha: 0.0, beta: 1.0 }
    }

    fn flat_constant_spread(n: usize) -> (Vec<f64>, Vec<f64>) {
        let p2: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 * 0.1).collect();
        let p1: Vec<f64> = p2.clone(); // spread is always 0 (p1 == p2, alpha=0, beta=1)
        (p1, p2)
    }

    #[test]
    fn sigma_guard_returns_none_on_constant_spread() {
        let (p1, p2) = flat_constant_spread(70);
        let sig = signal("A_B", &p1, &p2, &info(), None, 60, 2.5, 0.5, 3.0, 2.5);
        assert!(sig.is_none());
    }

    #[test]
    fn insufficient_history_returns_none() {
        let (p1, p2) = flat_constant_spread(30);
        let sig = signal("A_B", &p1, &p2, &info(), None, 60, 2.5, 0.5, 3.0, 2.5);
        assert!(sig.is_none());
    }

    #[test]
    fn enters_short_on_high_positive_z() {
        let n = 61;
        let mut p2: Vec<f64> = (0..n).map(|i| (100.0 + i as f64 * 0.01).ln()).collect();
        let mut p1 = p2.clone();
        // Add small noise to the lookback so sigma > 0, then spike the last bar.
        for i in 0..n - 1 {
            p1[i] += if i % 2 == 0 { 0.001 } else { -0.001 };
        }
        p1[n - 1] += 5.0 * 0.001; // large spread spike relative to lookback sigma
        let sig = signal("A_B", &p1, &p2, &info(), None, 60, 2.5, 0.5, 3.0, 2.5).unwrap();
        assert_eq!(sig.signal_type, SignalType::EnterShort);
        assert_eq!(sig.reason, "Z-Score > Z_ENTRY");
        p2.truncate(0); // silence unused mut warning in some toolchains
    }

    #[test]
    fn exit_priority_profit_before_stop_before_time() {
        // Construct z = 0.0 (within z_exit) while also satisfying stop/time conditions —
        // PROFIT must win regardless of evaluation order.
        let n = 61;
        let p2: Vec<f64> = (0..n).map(|i| (100.0 + i as f64 * 0.01).ln()).collect();
        let mut p1 = p2.clone();
        for i in 0..n - 1 {
            p1[i] += if i % 2 == 0 { 0.001 } else { -0.001 };
        }
        // last bar: spread == mean of lookback ⇒ z ≈ 0
        let pos = OpenPosition {
            direction: Direction::Short,
            entry_timestamp: 0,
            entry_candle_index: 0,
            entry_price_s1: 1.0,
            entry_price_s2: 1.0,
            qty_s1: 1,
            qty_s2: 1,
            z_score_entry: 3.0,
            hedge_ratio: (0.0, 1.0),
            half_life: 1.0, // time-stop would already be exceeded for almost any bars_held
            bars_held: 1000,
        };
        let sig = signal("A_B", &p1, &p2, &info(), Some(&pos), 60, 2.5, 0.5, 3.0, 2.5).unwrap();
        assert_eq!(sig.signal_type, SignalType::ExitShort);
        assert_eq!(sig.reason, "PROFIT TARGET");
    }

    #[test]
    fn consistency_checker_rejects_hold_from_flat() {
        assert!(!is_consistent_transition(None, SignalType::HoldLong));
        assert!(!is_consistent_transition(None, SignalType::ExitShort));
        assert!(is_consistent_transition(None, SignalType::EnterLong));
    }
}
