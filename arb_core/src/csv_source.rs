/// csv_source.rs — CSV-backed BarFetcher
///
/// The broker/exchange client is out of scope for this core (§9 design
/// note); this is the minimal concrete `BarFetcher` the two driver
/// binaries instantiate so the crate is runnable against local data —
/// one CSV file per `(symbol, timeframe)` under a configured data
/// directory, loaded via `polars`.
use crate::candle::{Candle, Timeframe};
use crate::store::BarFetcher;
use polars::prelude::*;
use std::path::PathBuf;
use tracing::warn;

/// Filename tag for a timeframe, e.g. `Timeframe::Minutes(15)` -> `"15M"`.
/// Mirrors `Timeframe::parse`'s accepted tokens so the two stay in lockstep.
fn timeframe_tag(timeframe: Timeframe) -> String {
    match timeframe {
        Timeframe::Minutes(1) => "1M".to_string(),
        Timeframe::Minutes(5) => "5M".to_string(),
        Timeframe::Minutes(15) => "15M".to_string(),
        Timeframe::Minutes(30) => "30M".to_string(),
        Timeframe::Minutes(60) => "60M".to_string(),
        Timeframe::Minutes(240) => "240M".to_string(),
        Timeframe::Minutes(n) => format!("{n}M"),
        Timeframe::Daily => "D".to_string(),
        Timeframe::Weekly => "W".to_string(),
    }
}

/// Loads `{symbol}_{timeframe_tag}.csv` from `data_dir`, backed by
/// `polars`. Each file is expected to carry `timestamp,open,high,low,
/// close,volume` columns (header required); rows are returned in
/// file order, which callers are expected to keep sorted ascending on
/// `timestamp` since `PriceTable::push` rejects out-of-order bars.
pub struct CsvBarFetcher {
    data_dir: PathBuf,
}

impl CsvBarFetcher {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.data_dir.join(format!("{symbol}_{}.csv", timeframe_tag(timeframe)))
    }

    fn load(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, PolarsError> {
        let path = self.path_for(symbol, timeframe);
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path))?
            .finish()?;

        let timestamp = df.column("timestamp")?.i64()?;
        let open = df.column("open")?.f64()?;
        let high = df.column("high")?.f64()?;
        let low = df.column("low")?.f64()?;
        let close = df.column("close")?.f64()?;
        let volume = df.column("volume")?.f64()?;

        let n = df.height();
        let mut candles = Vec::with_capacity(n);
        for i in 0..n {
            candles.push(Candle {
                timestamp: timestamp.get(i).unwrap_or_default(),
                open: open.get(i).unwrap_or_default(),
                high: high.get(i).unwrap_or_default(),
                low: low.get(i).unwrap_or_default(),
                close: close.get(i).unwrap_or_default(),
                volume: volume.get(i).unwrap_or_default(),
            });
        }
        Ok(candles)
    }
}

impl BarFetcher for CsvBarFetcher {
    fn fetch(&self, symbol: &str, timeframe: Timeframe, num_candles: usize) -> Vec<Candle> {
        match self.load(symbol, timeframe) {
            Ok(mut candles) => {
                if candles.len() > num_candles {
                    candles.drain(0..candles.len() - num_candles);
                }
                candles
            }
            Err(err) => {
                warn!(%symbol, ?timeframe, %err, "failed to load candle CSV");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_tag_matches_parse_round_trip() {
        for (tf, tag) in [
            (Timeframe::Minutes(1), "1M"),
            (Timeframe::Minutes(5), "5M"),
            (Timeframe::Minutes(15), "15M"),
            (Timeframe::Minutes(30), "30M"),
            (Timeframe::Minutes(60), "60M"),
            (Timeframe::Minutes(240), "240M"),
            (Timeframe::Daily, "D"),
            (Timeframe::Weekly, "W"),
        ] {
            assert_eq!(timeframe_tag(tf), tag);
            assert_eq!(Timeframe::parse(tag), Some(tf));
        }
    }

    #[test]
    fn fetch_on_missing_file_returns_empty_rather_than_panicking() {
        let fetcher = CsvBarFetcher::new("/nonexistent/data/dir/for/tests");
        let got = fetcher.fetch("NOPE", Timeframe::Daily, 10);
        assert!(got.is_empty());
    }

    #[test]
    fn path_for_builds_expected_filename() {
        let fetcher = CsvBarFetcher::new("/tmp/candles");
        let path = fetcher.path_for("BTCUSD", Timeframe::Minutes(15));
        assert_eq!(path, PathBuf::from("/tmp/candles/BTCUSD_15M.csv"));
    }
}
