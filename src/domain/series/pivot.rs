//! Pivot lows and bullish divergence detection.

use super::Series;

/// Strict pivot lows: the sample at `k` is kept only when all `range`
/// neighbours on each side exist and are strictly greater; otherwise NaN.
#[derive(Debug, Clone)]
pub struct PivotLows<S> {
    source: S,
    range: usize,
}

impl<S: Series> PivotLows<S> {
    pub fn new(source: S, range: usize) -> Self {
        PivotLows { source, range }
    }
}

impl<S: Series> Series for PivotLows<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        if lookback < self.range || lookback + self.range >= self.source.len() {
            return f64::NAN;
        }
        pivot_low_at(&self.source, self.range, lookback)
    }
}

/// Pivot low test that only compares against neighbours that exist, so the
/// newest and oldest samples can still qualify. A NaN neighbour does not
/// disqualify the sample.
fn pivot_low_at<S: Series>(source: &S, range: usize, lookback: usize) -> f64 {
    let len = source.len();
    if lookback >= len {
        return f64::NAN;
    }
    let value = source.get(lookback);
    if value.is_nan() {
        return f64::NAN;
    }

    let newer = lookback.min(range);
    let older = range.min(len - 1 - lookback);
    let beaten = |neighbour: f64| neighbour <= value;

    if (1..=newer).any(|i| beaten(source.get(lookback - i)))
        || (1..=older).any(|i| beaten(source.get(lookback + i)))
    {
        return f64::NAN;
    }
    value
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DivergenceKind {
    /// Signal makes a higher low while the reference makes a lower low.
    Bullish,
    /// Signal makes a lower low while the reference makes a higher low.
    HiddenBullish,
}

/// Compares the pivot low of `signal` at the evaluated lookback with the
/// nearest earlier pivot low inside `lookback_range`. Yields the lookback of
/// that earlier pivot when the pattern matches, NaN otherwise.
#[derive(Debug, Clone)]
pub struct Divergence<S, R> {
    kind: DivergenceKind,
    signal: S,
    reference: R,
    pivot_range: usize,
    lookback_range: usize,
}

impl<S: Series, R: Series> Divergence<S, R> {
    pub fn new(
        kind: DivergenceKind,
        signal: S,
        reference: R,
        pivot_range: usize,
        lookback_range: usize,
    ) -> Self {
        Divergence {
            kind,
            signal,
            reference,
            pivot_range,
            lookback_range,
        }
    }
}

impl<S: Series, R: Series> Series for Divergence<S, R> {
    fn len(&self) -> usize {
        self.signal.len().min(self.reference.len())
    }

    fn get(&self, lookback: usize) -> f64 {
        let signal_low = pivot_low_at(&self.signal, self.pivot_range, lookback);
        if signal_low.is_nan() {
            return f64::NAN;
        }

        let limit = self.lookback_range.min(self.signal.len());
        let Some(prev) = (1..limit)
            .map(|i| lookback + i)
            .find(|&i| !pivot_low_at(&self.signal, self.pivot_range, i).is_nan())
        else {
            return f64::NAN;
        };

        let prev_low = self.signal.get(prev);
        let reference_low = self.reference.get(lookback);
        let reference_prev = self.reference.get(prev);
        let matched = match self.kind {
            DivergenceKind::Bullish => signal_low > prev_low && reference_low < reference_prev,
            DivergenceKind::HiddenBullish => {
                signal_low < prev_low && reference_low > reference_prev
            }
        };
        if matched { prev as f64 } else { f64::NAN }
    }
}
