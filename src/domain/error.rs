//! Domain error types.
//!
//! Numeric evaluation never fails: undefined values are NaN. Errors only
//! arise at construction and ingestion boundaries, and from trade-state
//! transitions that the caller asked for out of order.

/// A strategy-description parse error, located by a dotted path into the document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at {path}: {message}")]
pub struct ParseError {
    pub message: String,
    pub path: String,
}

impl ParseError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Format the error with the offending JSON fragment underneath.
    pub fn display_with_context(&self, fragment: &str) -> String {
        format!("{err}\n  near: {fragment}", err = self, fragment = fragment)
    }
}

/// History construction failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HistoryError {
    #[error("column {column} has {actual} rows, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column {column}")]
    DuplicateColumn { column: String },
}

/// Invalid transitions requested on a trade position or session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeError {
    #[error("position is already closed")]
    PositionClosed,

    #[error("no open position to exit")]
    NoOpenPosition,

    #[error("invalid order size {size}")]
    InvalidSize { size: f64 },

    #[error("order size {size} does not match position direction")]
    DirectionMismatch { size: f64 },
}

/// Top-level error type for tatrader.
#[derive(Debug, thiserror::Error)]
pub enum TatraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    StrategyParse(#[from] ParseError),

    #[error("invalid strategy: {reason}")]
    StrategyInvalid { reason: String },

    #[error("data load error: {reason}")]
    DataLoad { reason: String },

    #[error("no data for {asset}")]
    NoData { asset: String },

    #[error("insufficient data for {asset}: have {bars} bars, need {minimum}")]
    InsufficientData {
        asset: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TatraderError> for std::process::ExitCode {
    fn from(err: &TatraderError) -> Self {
        let code: u8 = match err {
            TatraderError::Io(_) => 1,
            TatraderError::ConfigParse { .. }
            | TatraderError::ConfigMissing { .. }
            | TatraderError::ConfigInvalid { .. } => 2,
            TatraderError::DataLoad { .. } | TatraderError::History(_) => 3,
            TatraderError::StrategyParse(_) | TatraderError::StrategyInvalid { .. } => 4,
            TatraderError::NoData { .. }
            | TatraderError::InsufficientData { .. }
            | TatraderError::Trade(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
