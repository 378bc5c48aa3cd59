//! Moving averages: SMA, EMA, RMA, WMA and HMA.
//!
//! EMA and RMA share one recursion, `value = alpha * sample + (1 - alpha) * prior`,
//! seeded with the SMA of the oldest complete window. A NaN sample breaks the
//! chain and the next complete window reseeds it.

use super::{Series, window_fits};

/// Moving-average flavour used by bands and channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaKind {
    #[default]
    Sma,
    Ema,
    Wma,
    Rma,
    Hma,
}

impl MaKind {
    pub fn name(self) -> &'static str {
        match self {
            MaKind::Sma => "SMA",
            MaKind::Ema => "EMA",
            MaKind::Wma => "WMA",
            MaKind::Rma => "RMA",
            MaKind::Hma => "HMA",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SMA" => Some(MaKind::Sma),
            "EMA" => Some(MaKind::Ema),
            "WMA" => Some(MaKind::Wma),
            "RMA" => Some(MaKind::Rma),
            "HMA" => Some(MaKind::Hma),
            _ => None,
        }
    }
}

fn sma_at<S: Series>(source: &S, period: usize, lookback: usize) -> f64 {
    if !window_fits(source.len(), lookback, period) {
        return f64::NAN;
    }
    let sum: f64 = (lookback..lookback + period).map(|i| source.get(i)).sum();
    sum / period as f64
}

/// Run the smoothing recursion forward from the oldest complete window down to
/// `lookback`. Element `j` of the result holds the value at `lookback + j`.
///
/// Returns an empty vector when no complete window exists at or behind `lookback`.
pub fn smoothed_values<S: Series>(source: &S, period: usize, alpha: f64, lookback: usize) -> Vec<f64> {
    let size = source.len();
    if !window_fits(size, lookback, period) {
        return Vec::new();
    }

    let mut values = vec![f64::NAN; size - lookback];
    let mut prior = f64::NAN;
    for i in (lookback..=size - period).rev() {
        let value = if prior.is_nan() {
            sma_at(source, period, i)
        } else {
            alpha * source.get(i) + (1.0 - alpha) * prior
        };
        values[i - lookback] = value;
        prior = value;
    }
    values
}

#[derive(Debug, Clone)]
pub struct Sma<S> {
    source: S,
    period: usize,
}

impl<S: Series> Sma<S> {
    pub fn new(source: S, period: usize) -> Self {
        Sma { source, period }
    }
}

impl<S: Series> Series for Sma<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        sma_at(&self.source, self.period, lookback)
    }
}

/// Exponential moving average, `alpha = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema<S> {
    source: S,
    period: usize,
}

impl<S: Series> Ema<S> {
    pub fn new(source: S, period: usize) -> Self {
        Ema { source, period }
    }

    pub fn alpha(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }

    /// All values from `lookback` back to the oldest sample, in lookback order.
    pub fn values_from(&self, lookback: usize) -> Vec<f64> {
        smoothed_values(&self.source, self.period, self.alpha(), lookback)
    }
}

impl<S: Series> Series for Ema<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.values_from(lookback).first().copied().unwrap_or(f64::NAN)
    }
}

/// Wilder's running moving average, `alpha = 1 / period`.
#[derive(Debug, Clone)]
pub struct Rma<S> {
    source: S,
    period: usize,
}

impl<S: Series> Rma<S> {
    pub fn new(source: S, period: usize) -> Self {
        Rma { source, period }
    }

    pub fn alpha(&self) -> f64 {
        1.0 / self.period as f64
    }

    pub fn values_from(&self, lookback: usize) -> Vec<f64> {
        smoothed_values(&self.source, self.period, self.alpha(), lookback)
    }
}

impl<S: Series> Series for Rma<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.values_from(lookback).first().copied().unwrap_or(f64::NAN)
    }
}

/// Linearly weighted average; the newest sample in the window weighs `period`.
#[derive(Debug, Clone)]
pub struct Wma<S> {
    source: S,
    period: usize,
}

impl<S: Series> Wma<S> {
    pub fn new(source: S, period: usize) -> Self {
        Wma { source, period }
    }
}

impl<S: Series> Series for Wma<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        if !window_fits(self.source.len(), lookback, self.period) {
            return f64::NAN;
        }
        let mut weighted = 0.0;
        let mut weights = 0.0;
        for offset in 0..self.period {
            let weight = (self.period - offset) as f64;
            weighted += weight * self.source.get(lookback + offset);
            weights += weight;
        }
        weighted / weights
    }
}

/// `2 * WMA(period / 2) - WMA(period)`, the inner series of the Hull average.
struct HullSpread<'a, S> {
    source: &'a S,
    half: usize,
    period: usize,
}

impl<S: Series> Series for HullSpread<'_, S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        let fast = Wma::new(self.source, self.half).get(lookback);
        let slow = Wma::new(self.source, self.period).get(lookback);
        2.0 * fast - slow
    }
}

/// Hull moving average: `WMA(2 * WMA(p / 2) - WMA(p), floor(sqrt(p)))`.
#[derive(Debug, Clone)]
pub struct Hma<S> {
    source: S,
    period: usize,
}

impl<S: Series> Hma<S> {
    pub fn new(source: S, period: usize) -> Self {
        Hma { source, period }
    }
}

impl<S: Series> Series for Hma<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        let spread = HullSpread {
            source: &self.source,
            half: self.period / 2,
            period: self.period,
        };
        let root = (self.period as f64).sqrt().floor() as usize;
        Wma::new(spread, root).get(lookback)
    }
}

/// A moving average whose flavour is chosen at runtime.
#[derive(Debug, Clone)]
pub struct MovingAverage<S> {
    kind: MaKind,
    source: S,
    period: usize,
}

impl<S: Series> MovingAverage<S> {
    pub fn new(kind: MaKind, source: S, period: usize) -> Self {
        MovingAverage {
            kind,
            source,
            period,
        }
    }
}

impl<S: Series> Series for MovingAverage<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        let source = &self.source;
        match self.kind {
            MaKind::Sma => Sma::new(source, self.period).get(lookback),
            MaKind::Ema => Ema::new(source, self.period).get(lookback),
            MaKind::Wma => Wma::new(source, self.period).get(lookback),
            MaKind::Rma => Rma::new(source, self.period).get(lookback),
            MaKind::Hma => Hma::new(source, self.period).get(lookback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::{Constant, SeriesBuffer};
    use approx::assert_relative_eq;

    fn buf(samples: &[f64]) -> SeriesBuffer {
        SeriesBuffer::from_chronological(samples)
    }

    #[test]
    fn sma_window_mean() {
        let s = buf(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let sma = Sma::new(&s, 3);
        assert_relative_eq!(sma.get(0), 4.0);
        assert_relative_eq!(sma.get(2), 2.0);
        assert!(sma.get(3).is_nan());
    }

    #[test]
    fn ema_seed_and_recursion() {
        let s = buf(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let ema = Ema::new(&s, 3);
        let k = 0.5;
        let seed = 20.0;
        assert_relative_eq!(ema.get(2), seed);
        let e3 = 40.0 * k + seed * (1.0 - k);
        assert_relative_eq!(ema.get(1), e3);
        assert_relative_eq!(ema.get(0), 50.0 * k + e3 * (1.0 - k));
        assert!(ema.get(3).is_nan());
    }

    #[test]
    fn rma_uses_wilder_alpha() {
        let s = buf(&[1.0, 2.0, 3.0, 4.0]);
        let rma = Rma::new(&s, 2);
        let seed = 1.5;
        let r2 = 0.5 * 3.0 + 0.5 * seed;
        let r3 = 0.5 * 4.0 + 0.5 * r2;
        assert_relative_eq!(rma.get(0), r3);
        assert_relative_eq!(Rma::new(&s, 4).alpha(), 0.25);
    }

    #[test]
    fn smoothing_reseeds_after_nan() {
        let s = buf(&[f64::NAN, 2.0, 4.0, 6.0]);
        let ema = Ema::new(&s, 2);
        assert!(ema.get(2).is_nan());
        assert_relative_eq!(ema.get(1), 3.0);
        let k = 2.0 / 3.0;
        assert_relative_eq!(ema.get(0), 6.0 * k + 3.0 * (1.0 - k));
    }

    #[test]
    fn smoothed_values_layout() {
        let s = buf(&[1.0, 2.0, 3.0, 4.0]);
        let values = smoothed_values(&s, 2, 0.5, 1);
        assert_eq!(values.len(), 3);
        assert!(values[2].is_nan());
        assert_relative_eq!(values[1], 1.5);
        assert!(smoothed_values(&s, 5, 0.5, 0).is_empty());
    }

    #[test]
    fn wma_weights_newest_highest() {
        let s = buf(&[1.0, 2.0, 3.0]);
        let wma = Wma::new(&s, 3);
        assert_relative_eq!(wma.get(0), (3.0 * 3.0 + 2.0 * 2.0 + 1.0) / 6.0);
        assert!(wma.get(1).is_nan());
    }

    #[test]
    fn hma_of_linear_series_tracks_price() {
        let samples: Vec<f64> = (1..=30).map(f64::from).collect();
        let s = buf(&samples);
        let hma = Hma::new(&s, 9);
        assert_relative_eq!(hma.get(0), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn constant_input_yields_constant() {
        let c = Constant::new(7.0, 40);
        for kind in [MaKind::Sma, MaKind::Ema, MaKind::Wma, MaKind::Rma, MaKind::Hma] {
            let ma = MovingAverage::new(kind, c, 9);
            assert_relative_eq!(ma.get(0), 7.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn zero_period_is_nan() {
        let s = buf(&[1.0, 2.0]);
        assert!(Sma::new(&s, 0).get(0).is_nan());
        assert!(Ema::new(&s, 0).get(0).is_nan());
        assert!(Wma::new(&s, 0).get(0).is_nan());
    }

    #[test]
    fn ma_kind_names() {
        assert_eq!(MaKind::from_name("ema"), Some(MaKind::Ema));
        assert_eq!(MaKind::from_name(MaKind::Hma.name()), Some(MaKind::Hma));
        assert_eq!(MaKind::from_name("TEMA"), None);
    }
}
