/// live.rs — Live Driver price planning (§4.F.4)
///
/// The backtest driver executes at the next bar's open because it can see
/// the whole series up front. A live driver only has the current bar, so
/// before it can place an order it needs a *target* price for the leg it
/// doesn't already know the price of — and a *stop* price past which the
/// spread has moved against the entry thesis. Both come from inverting the
/// same spread equation the signal engine fits: `s = log(p1) - alpha -
/// beta * log(p2)`, solved for whichever log-price the driver wants to
/// plan around.
use crate::signal_engine::SignalType;

/// Target/stop prices for both legs of a freshly-entered pair. Only
/// produced for `EnterLong`/`EnterShort`; any other `SignalType` has
/// nothing to plan (the position is either already open or flat).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePlan {
    pub target_price_s1: f64,
    pub stop_price_s1: f64,
    pub target_price_s2: f64,
    pub stop_price_s2: f64,
}

/// Computes the exit/stop price plan for an ENTER signal.
///
/// `alpha`, `beta`, `mu`, `sigma` are the lookback-window spread fit
/// (see [`crate::signal_engine::rolling_spread_stats`]); `log_p1_current`
/// and `log_p2_current` are the current bar's log prices. Returns `None`
/// for any `signal_type` other than `EnterLong`/`EnterShort`, or if
/// `sigma` is non-positive.
#[allow(clippy::too_many_arguments)]
pub fn price_plan(
    signal_type: SignalType,
    alpha: f64,
    beta: f64,
    mu: f64,
    sigma: f64,
    z_exit: f64,
    z_stop: f64,
    log_p1_current: f64,
    log_p2_current: f64,
) -> Option<PricePlan> {
    if sigma <= 0.0 {
        return None;
    }
    // A SHORT entry bets the spread falls back toward mu from above, so its
    // profit target sits at +z_exit (spread still above mu, just closer to
    // it) and its stop sits further out at +z_stop. LONG is the mirror.
    let (target_z, stop_z) = match signal_type {
        SignalType::EnterShort => (z_exit, z_stop),
        SignalType::EnterLong => (-z_exit, -z_stop),
        _ => return None,
    };

    let target_spread = mu + target_z * sigma;
    let stop_spread = mu + stop_z * sigma;

    // s = log(p1) - alpha - beta * log(p2)
    //   => log(p1) = s + alpha + beta * log(p2)
    //   => log(p2) = (log(p1) - s - alpha) / beta     (beta != 0 by pair_finder's gate)
    let target_price_s1 = (target_spread + alpha + beta * log_p2_current).exp();
    let stop_price_s1 = (stop_spread + alpha + beta * log_p2_current).exp();
    let target_price_s2 = ((log_p1_current - target_spread - alpha) / beta).exp();
    let stop_price_s2 = ((log_p1_current - stop_spread - alpha) / beta).exp();

    Some(PricePlan { target_price_s1, stop_price_s1, target_price_s2, stop_price_s2 })
}
