//! Lazy lookback-indexed series algebra.
//!
//! Every series answers `len()` and `get(lookback)` where lookback 0 is the
//! newest sample. Reads at or beyond `len()` return NaN, and NaN flows through
//! every combinator by ordinary floating-point rules.

pub mod arithmetic;
pub mod momentum;
pub mod moving_average;
pub mod pivot;
pub mod volatility;

pub use arithmetic::{BinaryOp, Binary, Change, Constant, Negate, Scaled, Shift};
pub use momentum::{Macd, RelativeVolume, Roc, Rsi, Stochastic, StochasticRsi};
pub use moving_average::{Ema, Hma, MaKind, MovingAverage, Rma, Sma, Wma, smoothed_values};
pub use pivot::{Divergence, DivergenceKind, PivotLows};
pub use volatility::{
    Atr, BollingerBands, Highest, KeltnerChannel, KeltnerParams, Lowest, RangeKind, StdDev,
    TrueRange,
};

use super::history::{Field, Snapshot};

/// Channel selector for multi-output series and methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputSelector {
    #[default]
    Default,
    MiddleBand,
    UpperBand,
    LowerBand,
    MacdLine,
    SignalLine,
    Histogram,
    KPercent,
    DPercent,
}

impl OutputSelector {
    pub fn name(self) -> &'static str {
        match self {
            OutputSelector::Default => "default",
            OutputSelector::MiddleBand => "middle-band",
            OutputSelector::UpperBand => "upper-band",
            OutputSelector::LowerBand => "lower-band",
            OutputSelector::MacdLine => "macd-line",
            OutputSelector::SignalLine => "signal-line",
            OutputSelector::Histogram => "histogram",
            OutputSelector::KPercent => "k-percent",
            OutputSelector::DPercent => "d-percent",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let output = match name {
            "default" => OutputSelector::Default,
            "middle-band" => OutputSelector::MiddleBand,
            "upper-band" => OutputSelector::UpperBand,
            "lower-band" => OutputSelector::LowerBand,
            "macd-line" => OutputSelector::MacdLine,
            "signal-line" => OutputSelector::SignalLine,
            "histogram" => OutputSelector::Histogram,
            "k-percent" => OutputSelector::KPercent,
            "d-percent" => OutputSelector::DPercent,
            _ => return None,
        };
        Some(output)
    }
}

impl std::fmt::Display for OutputSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A lazily computed numeric sequence addressed by lookback.
pub trait Series {
    fn len(&self) -> usize;

    /// Value at `lookback`; NaN when `lookback >= len()`.
    fn get(&self, lookback: usize) -> f64;

    /// Read a named channel. Single-output series only answer `Default`.
    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        match output {
            OutputSelector::Default => self.get(lookback),
            _ => f64::NAN,
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Series + ?Sized> Series for &S {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, lookback: usize) -> f64 {
        (**self).get(lookback)
    }

    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        (**self).get_output(lookback, output)
    }
}

/// True when the window `[lookback, lookback + period)` lies inside `len` samples.
pub(crate) fn window_fits(len: usize, lookback: usize, period: usize) -> bool {
    period > 0 && lookback < len && period <= len - lookback
}

/// NaN-propagating maximum.
pub(crate) fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}

/// NaN-propagating minimum.
pub(crate) fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

/// Materialized values stored in lookback order (index 0 = newest).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesBuffer {
    values: Vec<f64>,
}

impl SeriesBuffer {
    pub fn from_lookback(values: Vec<f64>) -> Self {
        SeriesBuffer { values }
    }

    /// Build from samples ordered oldest first.
    pub fn from_chronological(samples: &[f64]) -> Self {
        SeriesBuffer {
            values: samples.iter().rev().copied().collect(),
        }
    }

    pub fn materialize<S: Series>(source: &S) -> Self {
        SeriesBuffer {
            values: (0..source.len()).map(|k| source.get(k)).collect(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl Series for SeriesBuffer {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.values.get(lookback).copied().unwrap_or(f64::NAN)
    }
}

/// A canonical field read from successive snapshots.
#[derive(Debug, Clone, Copy)]
pub struct FieldSeries<'a> {
    snapshot: Snapshot<'a>,
    field: Field,
}

impl<'a> FieldSeries<'a> {
    pub fn new(snapshot: Snapshot<'a>, field: Field) -> Self {
        FieldSeries { snapshot, field }
    }
}

impl Series for FieldSeries<'_> {
    fn len(&self) -> usize {
        self.snapshot.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.snapshot.at(lookback).field(self.field)
    }
}

/// An arbitrary named column read from successive snapshots.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSeries<'a> {
    snapshot: Snapshot<'a>,
    name: &'a str,
}

impl<'a> ColumnSeries<'a> {
    pub fn new(snapshot: Snapshot<'a>, name: &'a str) -> Self {
        ColumnSeries { snapshot, name }
    }
}

impl Series for ColumnSeries<'_> {
    fn len(&self) -> usize {
        self.snapshot.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.snapshot.at(lookback).get(self.name)
    }
}
