pub mod backtest;
pub mod cache;
pub mod candle;
pub mod config;
pub mod csv_source;
pub mod error;
pub mod kernels;
pub mod live;
pub mod metrics;
pub mod pair_finder;
pub mod signal_engine;
pub mod store;

pub use backtest::{print_dual_report, run_backtest, write_trade_log_csv, BacktestOutput, ClosedTrade};
pub use cache::StrategyCache;
pub use candle::{AlignedBarMatrix, AlignedCloseMatrix, Candle, PriceTable, Timeframe};
pub use config::ArbConfig;
pub use csv_source::CsvBarFetcher;
pub use error::{ArbError, ArbResult, ConfigError};
pub use live::{price_plan, PricePlan};
pub use metrics::{compute_metrics, PerfReport};
pub use pair_finder::{find_cointegrated_pairs, PairInfo};
pub use signal_engine::{signal, rolling_spread_stats, Direction, OpenPosition, PairSignal, SignalType};
pub use store::{BarFetcher, PriceStore};
