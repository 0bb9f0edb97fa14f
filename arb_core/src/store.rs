/// store.rs — Price Series Store
///
/// Holds one append-only `PriceTable` per `(symbol, timeframe)` in memory and
/// extends it on demand via an injected `BarFetcher`. The concrete broker
/// client (historical OHLCV REST calls, live quote snapshots) is out of
/// scope for this core — callers plug in whatever fetcher they have; the
/// store only specifies the trait boundary and the alignment/resampling
/// logic that sits downstream of it.
use crate::candle::{AlignedCloseMatrix, Candle, PriceTable, Timeframe};
use crate::error::ArbError;
use ahash::AHashMap;

/// External collaborator: fetches the most recent `num_candles` bars for a
/// symbol/timeframe. Implementations live outside this crate (a REST client,
/// a parquet cache reader, a test fixture).
pub trait BarFetcher {
    fn fetch(&self, symbol: &str, timeframe: Timeframe, num_candles: usize) -> Vec<Candle>;
}

pub struct PriceStore<F: BarFetcher> {
    fetcher: F,
    tables: AHashMap<(String, Timeframe), PriceTable>,
}

impl<F: BarFetcher> PriceStore<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher, tables: AHashMap::new() }
    }

    /// Returns the most recent `num_candles` candles for `symbol`, fetching
    /// (and merging into the append-only cache) as needed.
    pub fn get_candles(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        num_candles: usize,
    ) -> Result<Vec<Candle>, ArbError> {
        let key = (symbol.to_string(), timeframe);
        let needs_fetch = self
            .tables
            .get(&key)
            .map(|t| t.len() < num_candles)
            .unwrap_or(true);

        if needs_fetch {
            let fetched = self.fetcher.fetch(symbol, timeframe, num_candles);
            let table = self.tables.entry(key.clone()).or_insert_with(PriceTable::new);
            for c in fetched {
                table.push(c); // append-only: duplicates/out-of-order silently ignored
            }
        }

        let table = self.tables.get(&key);
        match table.and_then(|t| t.tail(num_candles)) {
            Some(slice) => Ok(slice.to_vec()),
            None => Err(ArbError::DataUnavailable {
                symbol: symbol.to_string(),
                requested: num_candles,
                available: table.map(|t| t.len()).unwrap_or(0),
            }),
        }
    }

    /// Builds an aligned close matrix across `symbols`, fetching enough bars
    /// per symbol to satisfy `tail_length` where possible. Fails with
    /// `InsufficientAlignment` if the inner join leaves fewer than
    /// `tail_length` common rows.
    pub fn align_close(
        &mut self,
        symbols: &[String],
        timeframe: Timeframe,
        tail_length: usize,
    ) -> Result<AlignedCloseMatrix, ArbError> {
        // Fetch generously: missing rows in one symbol can shrink the joined
        // length below a per-symbol tail, so request extra slack up front.
        let fetch_len = tail_length + tail_length / 5 + 10;
        for symbol in symbols {
            let _ = self.get_candles(symbol, timeframe, fetch_len);
        }

        let owned_tables: Vec<(&str, &PriceTable)> = symbols
            .iter()
            .filter_map(|s| self.tables.get(&(s.clone(), timeframe)).map(|t| (s.as_str(), t)))
            .collect();

        let matrix = AlignedCloseMatrix::align(&owned_tables, Some(tail_length));
        if matrix.num_rows() < tail_length {
            return Err(ArbError::InsufficientAlignment { got: matrix.num_rows(), need: tail_length });
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixtureFetcher {
        bars: AHashMap<String, Vec<Candle>>,
    }

    impl BarFetcher for FixtureFetcher {
        fn fetch(&self, symbol: &str, _timeframe: Timeframe, num_candles: usize) -> Vec<Candle> {
            self.bars
                .get(symbol)
                .map(|v| {
                    let start = v.len().saturating_sub(num_candles);
                    v[start..].to_vec()
                })
                .unwrap_or_default()
        }
    }

    fn make_bars(n: i64, start_price: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                timestamp: i,
                open: start_price + i as f64,
                high: start_price + i as f64,
                low: start_price + i as f64,
                close: start_price + i as f64,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn get_candles_fails_when_insufficient() {
        let mut bars = AHashMap::new();
        bars.insert("A".to_string(), make_bars(5, 1.0));
        let mut store = PriceStore::new(FixtureFetcher { bars });
        let err = store.get_candles("A", Timeframe::Daily, 10).unwrap_err();
        assert!(matches!(err, ArbError::DataUnavailable { .. }));
    }

    #[test]
    fn get_candles_succeeds_with_enough_bars() {
        let mut bars = AHashMap::new();
        bars.insert("A".to_string(), make_bars(20, 1.0));
        let mut store = PriceStore::new(FixtureFetcher { bars });
        let got = store.get_candles("A", Timeframe::Daily, 10).unwrap();
        assert_eq!(got.len(), 10);
    }

    #[test]
    fn align_close_fails_below_tail_length() {
        let mut bars = AHashMap::new();
        bars.insert("A".to_string(), make_bars(20, 1.0));
        bars.insert("B".to_string(), make_bars(5, 100.0)); // too short
        let mut store = PriceStore::new(FixtureFetcher { bars });
        let err = store
            .align_close(&["A".to_string(), "B".to_string()], Timeframe::Daily, 15)
            .unwrap_err();
        assert!(matches!(err, ArbError::InsufficientAlignment { .. }));
    }

    #[test]
    fn align_close_succeeds() {
        let mut bars = AHashMap::new();
        bars.insert("A".to_string(), make_bars(30, 1.0));
        bars.insert("B".to_string(), make_bars(30, 100.0));
        let mut store = PriceStore::new(FixtureFetcher { bars });
        let m = store
            .align_close(&["A".to_string(), "B".to_string()], Timeframe::Daily, 15)
            .unwrap();
        assert_eq!(m.num_rows(), 15);
    }
}
