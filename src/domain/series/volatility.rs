//! Range and dispersion series: true range, ATR, rolling extremes, standard
//! deviation, Bollinger Bands and Keltner Channels.

use super::arithmetic::{Binary, BinaryOp};
use super::moving_average::{MaKind, MovingAverage, Rma};
use super::{OutputSelector, Series, nan_max, nan_min, window_fits};

/// `max(|high - low|, |high - prevClose|, |low - prevClose|)`.
///
/// At the oldest sample the previous close is the current close.
#[derive(Debug, Clone)]
pub struct TrueRange<H, L, C> {
    high: H,
    low: L,
    close: C,
}

impl<H: Series, L: Series, C: Series> TrueRange<H, L, C> {
    pub fn new(high: H, low: L, close: C) -> Self {
        TrueRange { high, low, close }
    }
}

impl<H: Series, L: Series, C: Series> Series for TrueRange<H, L, C> {
    fn len(&self) -> usize {
        self.high.len().min(self.low.len()).min(self.close.len())
    }

    fn get(&self, lookback: usize) -> f64 {
        let len = self.len();
        if lookback >= len {
            return f64::NAN;
        }
        let high = self.high.get(lookback);
        let low = self.low.get(lookback);
        let prev_close = if lookback + 1 < len {
            self.close.get(lookback + 1)
        } else {
            self.close.get(lookback)
        };
        nan_max(
            (high - low).abs(),
            nan_max((high - prev_close).abs(), (low - prev_close).abs()),
        )
    }
}

/// `RMA(TrueRange, period) * multiplier`.
#[derive(Debug, Clone)]
pub struct Atr<H, L, C> {
    true_range: TrueRange<H, L, C>,
    period: usize,
    multiplier: f64,
}

impl<H: Series, L: Series, C: Series> Atr<H, L, C> {
    pub fn new(high: H, low: L, close: C, period: usize, multiplier: f64) -> Self {
        Atr {
            true_range: TrueRange::new(high, low, close),
            period,
            multiplier,
        }
    }
}

impl<H: Series, L: Series, C: Series> Series for Atr<H, L, C> {
    fn len(&self) -> usize {
        self.true_range.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        Rma::new(&self.true_range, self.period).get(lookback) * self.multiplier
    }
}

#[derive(Debug, Clone)]
pub struct Highest<S> {
    source: S,
    period: usize,
}

impl<S: Series> Highest<S> {
    pub fn new(source: S, period: usize) -> Self {
        Highest { source, period }
    }
}

impl<S: Series> Series for Highest<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        if !window_fits(self.source.len(), lookback, self.period) {
            return f64::NAN;
        }
        (lookback..lookback + self.period)
            .map(|i| self.source.get(i))
            .fold(f64::NEG_INFINITY, nan_max)
    }
}

#[derive(Debug, Clone)]
pub struct Lowest<S> {
    source: S,
    period: usize,
}

impl<S: Series> Lowest<S> {
    pub fn new(source: S, period: usize) -> Self {
        Lowest { source, period }
    }
}

impl<S: Series> Series for Lowest<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        if !window_fits(self.source.len(), lookback, self.period) {
            return f64::NAN;
        }
        (lookback..lookback + self.period)
            .map(|i| self.source.get(i))
            .fold(f64::INFINITY, nan_min)
    }
}

/// Population standard deviation over a trailing window.
#[derive(Debug, Clone)]
pub struct StdDev<S> {
    source: S,
    period: usize,
}

impl<S: Series> StdDev<S> {
    pub fn new(source: S, period: usize) -> Self {
        StdDev { source, period }
    }
}

impl<S: Series> Series for StdDev<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        if !window_fits(self.source.len(), lookback, self.period) {
            return f64::NAN;
        }
        let window: Vec<f64> = (lookback..lookback + self.period)
            .map(|i| self.source.get(i))
            .collect();
        let n = self.period as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt()
    }
}

/// Middle band is a moving average; the bands sit `multiplier` standard
/// deviations either side of it. The default channel is the middle band.
#[derive(Debug, Clone)]
pub struct BollingerBands<S> {
    kind: MaKind,
    source: S,
    period: usize,
    multiplier: f64,
}

impl<S: Series> BollingerBands<S> {
    pub fn new(kind: MaKind, source: S, period: usize, multiplier: f64) -> Self {
        BollingerBands {
            kind,
            source,
            period,
            multiplier,
        }
    }
}

impl<S: Series> Series for BollingerBands<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.get_output(lookback, OutputSelector::MiddleBand)
    }

    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        let middle = || MovingAverage::new(self.kind, &self.source, self.period).get(lookback);
        let width = || StdDev::new(&self.source, self.period).get(lookback) * self.multiplier;
        match output {
            OutputSelector::Default | OutputSelector::MiddleBand => middle(),
            OutputSelector::UpperBand => middle() + width(),
            OutputSelector::LowerBand => middle() - width(),
            _ => f64::NAN,
        }
    }
}

/// How a Keltner Channel measures its band width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RangeKind {
    /// ATR over the range period.
    #[default]
    Atr,
    /// Moving average of the true range over the MA period.
    TrueRange,
    /// Moving average of `high - low` over the MA period.
    HighLow,
}

impl RangeKind {
    pub fn name(self) -> &'static str {
        match self {
            RangeKind::Atr => "ATR",
            RangeKind::TrueRange => "TR",
            RangeKind::HighLow => "HL",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "ATR" => Some(RangeKind::Atr),
            "TR" | "TRUE_RANGE" => Some(RangeKind::TrueRange),
            "HL" | "HIGH_LOW" => Some(RangeKind::HighLow),
            _ => None,
        }
    }
}

/// Keltner Channel parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeltnerParams {
    pub ma_kind: MaKind,
    pub ma_period: usize,
    pub range_kind: RangeKind,
    pub range_period: usize,
    pub multiplier: f64,
}

/// `middle ± range * multiplier` around a moving average of `source`.
#[derive(Debug, Clone)]
pub struct KeltnerChannel<S, H, L, C> {
    params: KeltnerParams,
    source: S,
    high: H,
    low: L,
    close: C,
}

impl<S: Series, H: Series, L: Series, C: Series> KeltnerChannel<S, H, L, C> {
    pub fn new(params: KeltnerParams, source: S, high: H, low: L, close: C) -> Self {
        KeltnerChannel {
            params,
            source,
            high,
            low,
            close,
        }
    }

    fn range(&self, lookback: usize) -> f64 {
        let p = &self.params;
        match p.range_kind {
            RangeKind::Atr => {
                Atr::new(&self.high, &self.low, &self.close, p.range_period, 1.0).get(lookback)
            }
            RangeKind::TrueRange => {
                let tr = TrueRange::new(&self.high, &self.low, &self.close);
                MovingAverage::new(p.ma_kind, tr, p.ma_period).get(lookback)
            }
            RangeKind::HighLow => {
                let spread = Binary::new(BinaryOp::Subtract, &self.high, &self.low);
                MovingAverage::new(p.ma_kind, spread, p.ma_period).get(lookback)
            }
        }
    }
}

impl<S: Series, H: Series, L: Series, C: Series> Series for KeltnerChannel<S, H, L, C> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.get_output(lookback, OutputSelector::MiddleBand)
    }

    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        let p = &self.params;
        let middle = || MovingAverage::new(p.ma_kind, &self.source, p.ma_period).get(lookback);
        match output {
            OutputSelector::Default | OutputSelector::MiddleBand => middle(),
            OutputSelector::UpperBand => middle() + self.range(lookback) * p.multiplier,
            OutputSelector::LowerBand => middle() - self.range(lookback) * p.multiplier,
            _ => f64::NAN,
        }
    }
}
