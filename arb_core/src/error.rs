use thiserror::Error;

/// Error taxonomy for the pair-discovery and signal pipeline.
///
/// Pure statistical functions (§4.B) prefer sentinel return values over these
/// variants where the caller is expected to keep going regardless (ADF returns
/// 1.0 on internal failure, HalfLife returns -1.0) — see `kernels`. This enum
/// covers the cases where the caller needs to branch on *why* something failed.
#[derive(Debug, Error)]
pub enum ArbError {
    #[error("data unavailable for {symbol}: requested {requested} bars, got {available}")]
    DataUnavailable {
        symbol: String,
        requested: usize,
        available: usize,
    },

    #[error("insufficient alignment: aligned matrix has {got} rows, need at least {need}")]
    InsufficientAlignment { got: usize, need: usize },

    #[error("singular design matrix: {0}")]
    SingularDesign(String),

    #[error("numeric instability: {0}")]
    NumericInstability(String),

    #[error("statistical computation failed: {0}")]
    StatisticalFailure(String),

    #[error("illegal signal transition: state={state} signal_type={signal_type}")]
    SignalOrderingViolation { state: String, signal_type: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config key {key}: {source}")]
    Parse {
        key: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type ArbResult<T> = Result<T, ArbError>;
