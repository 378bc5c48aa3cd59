//! Momentum oscillators: RSI, ROC, relative volume, MACD and the stochastics.

use super::arithmetic::Change;
use super::moving_average::{Ema, Rma, Sma};
use super::volatility::{Highest, Lowest};
use super::{OutputSelector, Series, SeriesBuffer, window_fits};

/// Positive (`up`) or negative part of the one-step change, NaN preserved.
struct Directional<S> {
    change: Change<S>,
    up: bool,
}

impl<S: Series> Series for Directional<S> {
    fn len(&self) -> usize {
        self.change.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        let change = self.change.get(lookback);
        if change.is_nan() {
            f64::NAN
        } else if self.up {
            change.max(0.0)
        } else {
            (-change).max(0.0)
        }
    }
}

/// Relative strength index on Wilder-smoothed gains and losses.
#[derive(Debug, Clone)]
pub struct Rsi<S> {
    source: S,
    period: usize,
}

impl<S: Series> Rsi<S> {
    pub fn new(source: S, period: usize) -> Self {
        Rsi { source, period }
    }

    /// RSI from `lookback` back to the oldest sample, in lookback order.
    pub fn values_from(&self, lookback: usize) -> Vec<f64> {
        let gains = Directional {
            change: Change::new(&self.source),
            up: true,
        };
        let losses = Directional {
            change: Change::new(&self.source),
            up: false,
        };
        let avg_gain = Rma::new(gains, self.period).values_from(lookback);
        let avg_loss = Rma::new(losses, self.period).values_from(lookback);
        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(gain, loss)| 100.0 - 100.0 / (1.0 + gain / loss))
            .collect()
    }
}

impl<S: Series> Series for Rsi<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.values_from(lookback).first().copied().unwrap_or(f64::NAN)
    }
}

/// Rate of change in percent over `period` samples.
#[derive(Debug, Clone)]
pub struct Roc<S> {
    source: S,
    period: usize,
}

impl<S: Series> Roc<S> {
    pub fn new(source: S, period: usize) -> Self {
        Roc { source, period }
    }
}

impl<S: Series> Series for Roc<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        if !window_fits(self.source.len(), lookback, self.period + 1) {
            return f64::NAN;
        }
        let current = self.source.get(lookback);
        let past = self.source.get(lookback + self.period);
        let roc = 100.0 * (current - past) / past;
        if roc.is_finite() { roc } else { f64::NAN }
    }
}

/// Volume divided by its simple average over `period`.
#[derive(Debug, Clone)]
pub struct RelativeVolume<S> {
    volume: S,
    period: usize,
}

impl<S: Series> RelativeVolume<S> {
    pub fn new(volume: S, period: usize) -> Self {
        RelativeVolume { volume, period }
    }
}

impl<S: Series> Series for RelativeVolume<S> {
    fn len(&self) -> usize {
        self.volume.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        let average = Sma::new(&self.volume, self.period).get(lookback);
        let rvol = self.volume.get(lookback) / average;
        if rvol.is_finite() { rvol } else { f64::NAN }
    }
}

/// MACD line, signal line and histogram. The default channel is the MACD line.
#[derive(Debug, Clone)]
pub struct Macd<S> {
    source: S,
    fast: usize,
    slow: usize,
    signal: usize,
}

impl<S: Series> Macd<S> {
    pub fn new(source: S, fast: usize, slow: usize, signal: usize) -> Self {
        Macd {
            source,
            fast,
            slow,
            signal,
        }
    }

    fn macd_line(&self, lookback: usize) -> SeriesBuffer {
        let fast = Ema::new(&self.source, self.fast).values_from(lookback);
        let slow = Ema::new(&self.source, self.slow).values_from(lookback);
        let span = self.source.len().saturating_sub(lookback);
        let line = (0..span)
            .map(|j| {
                let f = fast.get(j).copied().unwrap_or(f64::NAN);
                let s = slow.get(j).copied().unwrap_or(f64::NAN);
                f - s
            })
            .collect();
        SeriesBuffer::from_lookback(line)
    }
}

impl<S: Series> Series for Macd<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.get_output(lookback, OutputSelector::MacdLine)
    }

    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        let line = self.macd_line(lookback);
        let signal = || Ema::new(&line, self.signal).get(0);
        match output {
            OutputSelector::Default | OutputSelector::MacdLine => line.get(0),
            OutputSelector::SignalLine => signal(),
            OutputSelector::Histogram => line.get(0) - signal(),
            _ => f64::NAN,
        }
    }
}

/// `100 * (close - lowest(low)) / (highest(high) - lowest(low))`.
struct RawStochastic<'a, C, H, L> {
    close: &'a C,
    high: &'a H,
    low: &'a L,
    period: usize,
}

impl<C: Series, H: Series, L: Series> Series for RawStochastic<'_, C, H, L> {
    fn len(&self) -> usize {
        self.close.len().min(self.high.len()).min(self.low.len())
    }

    fn get(&self, lookback: usize) -> f64 {
        let highest = Highest::new(self.high, self.period).get(lookback);
        let lowest = Lowest::new(self.low, self.period).get(lookback);
        let stoch = 100.0 * (self.close.get(lookback) - lowest) / (highest - lowest);
        if stoch.is_finite() { stoch } else { f64::NAN }
    }
}

/// Slow stochastic oscillator. `%K` is the default channel.
#[derive(Debug, Clone)]
pub struct Stochastic<C, H, L> {
    close: C,
    high: H,
    low: L,
    k_period: usize,
    k_smooth: usize,
    d_period: usize,
}

impl<C: Series, H: Series, L: Series> Stochastic<C, H, L> {
    pub fn new(close: C, high: H, low: L, k_period: usize, k_smooth: usize, d_period: usize) -> Self {
        Stochastic {
            close,
            high,
            low,
            k_period,
            k_smooth,
            d_period,
        }
    }
}

impl<C: Series, H: Series, L: Series> Series for Stochastic<C, H, L> {
    fn len(&self) -> usize {
        self.close.len().min(self.high.len()).min(self.low.len())
    }

    fn get(&self, lookback: usize) -> f64 {
        self.get_output(lookback, OutputSelector::KPercent)
    }

    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        let raw = RawStochastic {
            close: &self.close,
            high: &self.high,
            low: &self.low,
            period: self.k_period,
        };
        let k_percent = Sma::new(raw, self.k_smooth);
        match output {
            OutputSelector::Default | OutputSelector::KPercent => k_percent.get(lookback),
            OutputSelector::DPercent => Sma::new(&k_percent, self.d_period).get(lookback),
            _ => f64::NAN,
        }
    }
}

/// Stochastic oscillator applied to an RSI of `source`.
#[derive(Debug, Clone)]
pub struct StochasticRsi<S> {
    source: S,
    rsi_period: usize,
    k_period: usize,
    k_smooth: usize,
    d_period: usize,
}

impl<S: Series> StochasticRsi<S> {
    pub fn new(source: S, rsi_period: usize, k_period: usize, k_smooth: usize, d_period: usize) -> Self {
        StochasticRsi {
            source,
            rsi_period,
            k_period,
            k_smooth,
            d_period,
        }
    }
}

impl<S: Series> Series for StochasticRsi<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.get_output(lookback, OutputSelector::KPercent)
    }

    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        let rsi = SeriesBuffer::from_lookback(Rsi::new(&self.source, self.rsi_period).values_from(lookback));
        Stochastic::new(&rsi, &rsi, &rsi, self.k_period, self.k_smooth, self.d_period)
            .get_output(0, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::Constant;
    use approx::assert_relative_eq;

    fn buf(samples: &[f64]) -> SeriesBuffer {
        SeriesBuffer::from_chronological(samples)
    }

    #[test]
    fn rsi_of_rising_series_is_hundred() {
        let samples: Vec<f64> = (1..=20).map(f64::from).collect();
        let s = buf(&samples);
        assert_relative_eq!(Rsi::new(&s, 14).get(0), 100.0);
    }

    #[test]
    fn rsi_balanced_moves_is_fifty() {
        let s = buf(&[10.0, 11.0, 10.0, 11.0, 10.0]);
        // changes oldest..newest: +1 -1 +1 -1, seed over the first two
        let rsi = Rsi::new(&s, 2);
        let value = rsi.get(0);
        assert!(value > 0.0 && value < 100.0);
        assert!(rsi.get(3).is_nan());
    }

    #[test]
    fn rsi_values_from_matches_get() {
        let s = buf(&[44.0, 44.3, 44.1, 43.6, 44.3, 44.8, 45.1, 45.4, 45.8, 46.1]);
        let rsi = Rsi::new(&s, 3);
        let values = rsi.values_from(1);
        assert_relative_eq!(values[0], rsi.get(1));
        assert_relative_eq!(values[2], rsi.get(3));
    }

    #[test]
    fn roc_percent_change() {
        let s = buf(&[100.0, 105.0, 110.0]);
        assert_relative_eq!(Roc::new(&s, 2).get(0), 10.0);
        assert_relative_eq!(Roc::new(&s, 1).get(1), 5.0);
        assert!(Roc::new(&s, 3).get(0).is_nan());
    }

    #[test]
    fn rvol_against_average() {
        let v = buf(&[100.0, 100.0, 100.0, 400.0]);
        assert_relative_eq!(RelativeVolume::new(&v, 4).get(0), 400.0 / 175.0);
        assert!(RelativeVolume::new(&v, 5).get(0).is_nan());
    }

    #[test]
    fn macd_of_constant_is_zero() {
        let c = Constant::new(50.0, 60);
        let macd = Macd::new(c, 12, 26, 9);
        assert_relative_eq!(macd.get(0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(macd.get_output(0, OutputSelector::SignalLine), 0.0, epsilon = 1e-12);
        assert_relative_eq!(macd.get_output(0, OutputSelector::Histogram), 0.0, epsilon = 1e-12);
        assert!(macd.get_output(0, OutputSelector::UpperBand).is_nan());
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let samples: Vec<f64> = (0..60).map(|i| 100.0 + (f64::from(i) * 0.3).sin() * 5.0).collect();
        let s = buf(&samples);
        let macd = Macd::new(&s, 12, 26, 9);
        let line = macd.get_output(2, OutputSelector::MacdLine);
        let signal = macd.get_output(2, OutputSelector::SignalLine);
        let hist = macd.get_output(2, OutputSelector::Histogram);
        assert_relative_eq!(hist, line - signal, epsilon = 1e-12);
        assert!(macd.get_output(40, OutputSelector::SignalLine).is_nan());
    }

    #[test]
    fn stochastic_k_and_d() {
        let close = buf(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let stoch = Stochastic::new(&close, &close, &close, 3, 1, 2);
        // close is always the window high
        assert_relative_eq!(stoch.get(0), 100.0);
        assert_relative_eq!(stoch.get_output(0, OutputSelector::DPercent), 100.0);
        assert!(stoch.get(3).is_nan());
    }

    #[test]
    fn stochastic_flat_window_is_nan() {
        let c = Constant::new(3.0, 10);
        assert!(Stochastic::new(c, c, c, 5, 3, 3).get(0).is_nan());
    }

    #[test]
    fn stochastic_rsi_bounds() {
        let samples: Vec<f64> = (0..80).map(|i| 100.0 + (f64::from(i) * 0.4).sin() * 10.0).collect();
        let s = buf(&samples);
        let srsi = StochasticRsi::new(&s, 14, 14, 3, 3);
        let k = srsi.get(0);
        let d = srsi.get_output(0, OutputSelector::DPercent);
        assert!((0.0..=100.0).contains(&k));
        assert!((0.0..=100.0).contains(&d));
    }
}
