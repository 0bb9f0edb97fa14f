/// candle.rs — Price Series Data Model
///
/// `Candle` and `PriceTable` are the fixed-period OHLCV substrate everything
/// else in this crate builds on. `AlignedCloseMatrix` is the inner-joined
/// close-price table the pair finder and signal engine consume.
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub timestamp: i64, // unix seconds, exchange trading-zone wall clock
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bar period. `Minutes(n)` covers the intraday cases in §6's `TIMEFRAME`
/// table (1/5/15/30/60/240); `Daily`/`Weekly` are the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    Minutes(u32),
    Daily,
    Weekly,
}

impl Timeframe {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1M" => Some(Timeframe::Minutes(1)),
            "5M" => Some(Timeframe::Minutes(5)),
            "15M" => Some(Timeframe::Minutes(15)),
            "30M" => Some(Timeframe::Minutes(30)),
            "60M" | "1H" => Some(Timeframe::Minutes(60)),
            "240M" | "4H" => Some(Timeframe::Minutes(240)),
            "D" => Some(Timeframe::Daily),
            "W" => Some(Timeframe::Weekly),
            _ => None,
        }
    }
}

/// An ordered, strictly time-monotone sequence of candles for one symbol at a
/// fixed period. Construction enforces the ordering invariant; callers that
/// need to append new bars go through `push`, which rejects out-of-order or
/// duplicate timestamps rather than silently reordering.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    candles: Vec<Candle>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self { candles: Vec::new() }
    }

    /// Builds a table by pushing `candles` in order, silently dropping any
    /// that violate the strict-monotone invariant (mirrors `push`'s contract).
    pub fn from_candles(candles: Vec<Candle>) -> Self {
        let mut table = Self::new();
        for c in candles {
            table.push(c);
        }
        table
    }

    /// Appends a candle, enforcing strict monotone ordering. Returns `false`
    /// (and drops the candle) if its timestamp does not strictly follow the
    /// last one — the store is append-only and never rewrites closed bars.
    pub fn push(&mut self, candle: Candle) -> bool {
        if let Some(last) = self.candles.last() {
            if candle.timestamp <= last.timestamp {
                return false;
            }
        }
        self.candles.push(candle);
        true
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    /// Most recent `n` candles, oldest first. `None` if fewer than `n` exist.
    pub fn tail(&self, n: usize) -> Option<&[Candle]> {
        if self.candles.len() < n {
            return None;
        }
        Some(&self.candles[self.candles.len() - n..])
    }

    /// Resamples this table to a coarser period using standard OHLCV
    /// aggregation (open=first, high=max, low=min, close=last, volume=sum).
    /// `bucket_of` maps a source timestamp to the key of the destination
    /// bucket it belongs to (e.g. day-of-week-anchored for weekly bars);
    /// a final partial bucket whose membership might still grow is dropped.
    pub fn resample(&self, bucket_of: impl Fn(i64) -> i64) -> PriceTable {
        let mut buckets: BTreeMap<i64, Vec<Candle>> = BTreeMap::new();
        for &c in &self.candles {
            buckets.entry(bucket_of(c.timestamp)).or_default().push(c);
        }

        let mut keys: Vec<i64> = buckets.keys().copied().collect();
        keys.sort_unstable();

        let mut out = PriceTable::new();
        // Drop the last bucket: without knowing the bucket's nominal close
        // time we cannot tell whether it is still accumulating partial data.
        for key in keys.iter().take(keys.len().saturating_sub(1)) {
            let group = &buckets[key];
            out.push(aggregate(group));
        }
        out
    }
}

/// Bucket key for weekly resampling: the timestamp (at UTC midnight) of the
/// last trading day (Friday) of the ISO week containing `ts`. Candles from
/// Saturday/Sunday (rare, but not assumed impossible for index futures/crypto
/// feeds upstream of this core) fall into the following week's bucket.
pub fn weekly_bucket(ts: i64) -> i64 {
    use chrono::{Datelike, TimeZone, Utc, Weekday};
    let dt = Utc.timestamp_opt(ts, 0).single().expect("timestamp out of range");
    let days_to_friday = (Weekday::Fri.num_days_from_monday() as i64 - dt.weekday().num_days_from_monday() as i64).rem_euclid(7);
    let friday = dt.date_naive() + chrono::Duration::days(days_to_friday);
    friday.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp()
}

fn aggregate(group: &[Candle]) -> Candle {
    let open = group.first().unwrap().open;
    let close = group.last().unwrap().close;
    let high = group.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = group.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let volume = group.iter().map(|c| c.volume).sum();
    Candle {
        timestamp: group.last().unwrap().timestamp,
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Close-price table keyed by timestamp (rows) and symbol (columns), formed
/// by inner-joining per-symbol `PriceTable`s. Only timestamps present in
/// every symbol survive.
#[derive(Debug, Clone)]
pub struct AlignedCloseMatrix {
    pub timestamps: Vec<i64>,
    pub symbols: Vec<String>,
    /// `closes[col][row]` — column-major so a pair finder can slice a whole
    /// symbol's series contiguously.
    pub closes: Vec<Vec<f64>>,
}

impl AlignedCloseMatrix {
    pub fn num_rows(&self) -> usize {
        self.timestamps.len()
    }

    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|idx| self.closes[idx].as_slice())
    }

    pub fn column_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// A view over rows `[start, end)` — used by the backtest driver to
    /// materialize formation-window slices ending at a given bar index
    /// without re-running the full inner join.
    pub fn slice_rows(&self, start: usize, end: usize) -> AlignedCloseMatrix {
        AlignedCloseMatrix {
            timestamps: self.timestamps[start..end].to_vec(),
            symbols: self.symbols.clone(),
            closes: self.closes.iter().map(|col| col[start..end].to_vec()).collect(),
        }
    }

    /// Inner-joins a set of per-symbol price tables on timestamp, keeping
    /// only rows present in every table, then takes the trailing
    /// `tail_length` rows (or all rows if `tail_length` is `None`).
    pub fn align(tables: &[(&str, &PriceTable)], tail_length: Option<usize>) -> AlignedCloseMatrix {
        if tables.is_empty() {
            return AlignedCloseMatrix { timestamps: vec![], symbols: vec![], closes: vec![] };
        }

        // Count how many tables contain each timestamp, and remember the
        // close for each (timestamp, symbol) pair.
        let mut per_ts: BTreeMap<i64, Vec<Option<f64>>> = BTreeMap::new();
        for (col, (_, table)) in tables.iter().enumerate() {
            for c in table.as_slice() {
                let entry = per_ts
                    .entry(c.timestamp)
                    .or_insert_with(|| vec![None; tables.len()]);
                entry[col] = Some(c.close);
            }
        }

        let mut timestamps: Vec<i64> = Vec::new();
        let mut closes: Vec<Vec<f64>> = vec![Vec::new(); tables.len()];
        for (ts, row) in per_ts {
            if row.iter().all(|v| v.is_some()) {
                timestamps.push(ts);
                for (col, v) in row.into_iter().enumerate() {
                    closes[col].push(v.unwrap());
                }
            }
        }

        if let Some(n) = tail_length {
            if timestamps.len() > n {
                let start = timestamps.len() - n;
                timestamps = timestamps[start..].to_vec();
                for col in closes.iter_mut() {
                    *col = col[start..].to_vec();
                }
            }
        }

        AlignedCloseMatrix {
            timestamps,
            symbols: tables.iter().map(|(s, _)| s.to_string()).collect(),
            closes,
        }
    }
}

/// Close prices plus opens, aligned the same way as `AlignedCloseMatrix`.
/// Only the backtest driver needs the open column (next-bar open-price
/// execution, §4.G) — the pair finder and signal engine operate on closes
/// alone, so this type stays out of their contract.
#[derive(Debug, Clone)]
pub struct AlignedBarMatrix {
    pub timestamps: Vec<i64>,
    pub symbols: Vec<String>,
    pub closes: Vec<Vec<f64>>,
    pub opens: Vec<Vec<f64>>,
}

impl AlignedBarMatrix {
    pub fn align(tables: &[(&str, &PriceTable)]) -> AlignedBarMatrix {
        let mut per_ts: BTreeMap<i64, Vec<Option<(f64, f64)>>> = BTreeMap::new();
        for (col, (_, table)) in tables.iter().enumerate() {
            for c in table.as_slice() {
                let entry = per_ts.entry(c.timestamp).or_insert_with(|| vec![None; tables.len()]);
                entry[col] = Some((c.open, c.close));
            }
        }

        let mut timestamps = Vec::new();
        let mut opens: Vec<Vec<f64>> = vec![Vec::new(); tables.len()];
        let mut closes: Vec<Vec<f64>> = vec![Vec::new(); tables.len()];
        for (ts, row) in per_ts {
            if row.iter().all(|v| v.is_some()) {
                timestamps.push(ts);
                for (col, v) in row.into_iter().enumerate() {
                    let (o, c) = v.unwrap();
                    opens[col].push(o);
                    closes[col].push(c);
                }
            }
        }

        AlignedBarMatrix {
            timestamps,
            symbols: tables.iter().map(|(s, _)| s.to_string()).collect(),
            closes,
            opens,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.timestamps.len()
    }

    pub fn column_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// The close-only view the pair finder/signal engine expect.
    pub fn as_close_matrix(&self) -> AlignedCloseMatrix {
        AlignedCloseMatrix {
            timestamps: self.timestamps.clone(),
            symbols: self.symbols.clone(),
            closes: self.closes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(ts: i64, close: f64) -> Candle {
        Candle { timestamp: ts, open: close, high: close, low: close, close, volume: 1.0 }
    }

    #[test]
    fn push_rejects_non_monotone() {
        let mut t = PriceTable::new();
        assert!(t.push(c(10, 1.0)));
        assert!(t.push(c(20, 1.0)));
        assert!(!t.push(c(15, 1.0)));
        assert!(!t.push(c(20, 1.0)));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn tail_returns_none_when_too_short() {
        let mut t = PriceTable::new();
        t.push(c(1, 1.0));
        assert!(t.tail(5).is_none());
        assert!(t.tail(1).is_some());
    }

    #[test]
    fn resample_identity_for_one_bucket_per_source_bar() {
        let mut t = PriceTable::new();
        for i in 0..5 {
            t.push(c(i, 100.0 + i as f64));
        }
        // bucket_of is identity → resample to itself, minus the trailing bucket.
        let r = t.resample(|ts| ts);
        assert_eq!(r.len(), 4);
        for (i, cand) in r.as_slice().iter().enumerate() {
            assert_eq!(cand.close, 100.0 + i as f64);
        }
    }

    #[test]
    fn resample_aggregates_volume_and_ohlc() {
        let mut t = PriceTable::new();
        // two 5-bar buckets (bucket key = ts / 5), plus a trailing partial one dropped.
        for i in 0..10 {
            t.push(Candle {
                timestamp: i,
                open: 10.0 + i as f64,
                high: 20.0 + i as f64,
                low: 1.0,
                close: 15.0 + i as f64,
                volume: 1.0,
            });
        }
        let r = t.resample(|ts| ts / 5);
        assert_eq!(r.len(), 1); // second bucket (ts 5..10) dropped as trailing
        let bar = &r.as_slice()[0];
        assert_eq!(bar.open, 10.0);
        assert_eq!(bar.volume, 5.0);
    }

    #[test]
    fn align_drops_rows_missing_any_symbol() {
        let mut a = PriceTable::new();
        a.push(c(1, 10.0));
        a.push(c(2, 11.0));
        a.push(c(3, 12.0));

        let mut b = PriceTable::new();
        b.push(c(1, 100.0));
        b.push(c(3, 102.0)); // missing ts=2

        let m = AlignedCloseMatrix::align(&[("A", &a), ("B", &b)], None);
        assert_eq!(m.timestamps, vec![1, 3]);
        assert_eq!(m.column("A").unwrap(), &[10.0, 12.0]);
        assert_eq!(m.column("B").unwrap(), &[100.0, 102.0]);
    }

    #[test]
    fn align_respects_tail_length() {
        let mut a = PriceTable::new();
        let mut b = PriceTable::new();
        for i in 0..10 {
            a.push(c(i, i as f64));
            b.push(c(i, i as f64 * 2.0));
        }
        let m = AlignedCloseMatrix::align(&[("A", &a), ("B", &b)], Some(3));
        assert_eq!(m.num_rows(), 3);
        assert_eq!(m.timestamps, vec![7, 8, 9]);
    }

    #[test]
    fn bar_matrix_carries_open_alongside_close() {
        let mut a = PriceTable::new();
        a.push(Candle { timestamp: 1, open: 9.0, high: 11.0, low: 8.0, close: 10.0, volume: 1.0 });
        a.push(Candle { timestamp: 2, open: 10.5, high: 12.0, low: 10.0, close: 11.0, volume: 1.0 });
        let m = AlignedBarMatrix::align(&[("A", &a)]);
        assert_eq!(m.opens[0], vec![9.0, 10.5]);
        assert_eq!(m.closes[0], vec![10.0, 11.0]);
    }

    #[test]
    fn from_candles_drops_non_monotone_like_push() {
        let t = PriceTable::from_candles(vec![c(1, 1.0), c(2, 2.0), c(2, 99.0), c(3, 3.0)]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.as_slice()[2].close, 3.0);
    }

    #[test]
    fn weekly_bucket_maps_a_week_to_its_friday() {
        // 2024-01-01 is a Monday; 2024-01-02 Tue, ... 2024-01-05 Fri, 2024-01-07 Sun.
        let monday = 1_704_067_200; // 2024-01-01T00:00:00Z
        let friday = 1_704_412_800; // 2024-01-05T00:00:00Z
        let sunday = 1_704_585_600; // 2024-01-07T00:00:00Z
        assert_eq!(weekly_bucket(monday), friday);
        assert_eq!(weekly_bucket(friday), friday);
        // Sunday belongs to the *next* week's Friday bucket.
        let next_friday = friday + 7 * 86_400;
        assert_eq!(weekly_bucket(sunday), next_friday);
    }
}
