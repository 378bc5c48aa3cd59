//! Element-wise arithmetic, differencing and shifting.

use super::{OutputSelector, Series};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    AbsDiff,
}

impl BinaryOp {
    /// Apply the operator. Division yielding a non-finite quotient is NaN.
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOp::Add => left + right,
            BinaryOp::Subtract => left - right,
            BinaryOp::Multiply => left * right,
            BinaryOp::Divide => {
                let quotient = left / right;
                if quotient.is_finite() { quotient } else { f64::NAN }
            }
            BinaryOp::AbsDiff => (left - right).abs(),
        }
    }
}

/// Two series combined at matching lookbacks.
#[derive(Debug, Clone)]
pub struct Binary<A, B> {
    op: BinaryOp,
    left: A,
    right: B,
}

impl<A: Series, B: Series> Binary<A, B> {
    pub fn new(op: BinaryOp, left: A, right: B) -> Self {
        Binary { op, left, right }
    }
}

impl<A: Series, B: Series> Series for Binary<A, B> {
    fn len(&self) -> usize {
        self.left.len().min(self.right.len())
    }

    fn get(&self, lookback: usize) -> f64 {
        self.get_output(lookback, OutputSelector::Default)
    }

    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        if lookback >= self.len() {
            return f64::NAN;
        }
        self.op.apply(
            self.left.get_output(lookback, output),
            self.right.get_output(lookback, output),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Negate<S> {
    source: S,
}

impl<S: Series> Negate<S> {
    pub fn new(source: S) -> Self {
        Negate { source }
    }
}

impl<S: Series> Series for Negate<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        -self.source.get(lookback)
    }

    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        -self.source.get_output(lookback, output)
    }
}

/// `source * factor`; percentages use `factor = percent / 100`.
#[derive(Debug, Clone)]
pub struct Scaled<S> {
    source: S,
    factor: f64,
}

impl<S: Series> Scaled<S> {
    pub fn new(source: S, factor: f64) -> Self {
        Scaled { source, factor }
    }

    pub fn percentage(source: S, percent: f64) -> Self {
        Scaled::new(source, percent / 100.0)
    }
}

impl<S: Series> Series for Scaled<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.source.get(lookback) * self.factor
    }

    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        self.source.get_output(lookback, output) * self.factor
    }
}

/// `change[k] = source[k] - source[k + 1]`; NaN at the oldest sample.
#[derive(Debug, Clone)]
pub struct Change<S> {
    source: S,
}

impl<S: Series> Change<S> {
    pub fn new(source: S) -> Self {
        Change { source }
    }
}

impl<S: Series> Series for Change<S> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        if lookback >= self.len() {
            return f64::NAN;
        }
        self.source.get(lookback) - self.source.get(lookback + 1)
    }
}

/// Reads the source `period` samples further back.
#[derive(Debug, Clone)]
pub struct Shift<S> {
    source: S,
    period: usize,
}

impl<S: Series> Shift<S> {
    pub fn new(source: S, period: usize) -> Self {
        Shift { source, period }
    }
}

impl<S: Series> Series for Shift<S> {
    fn len(&self) -> usize {
        self.source.len().saturating_sub(self.period)
    }

    fn get(&self, lookback: usize) -> f64 {
        self.get_output(lookback, OutputSelector::Default)
    }

    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        if lookback >= self.len() {
            return f64::NAN;
        }
        self.source.get_output(lookback + self.period, output)
    }
}

/// A constant value repeated `len` times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant {
    value: f64,
    len: usize,
}

impl Constant {
    pub fn new(value: f64, len: usize) -> Self {
        Constant { value, len }
    }
}

impl Series for Constant {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, lookback: usize) -> f64 {
        if lookback < self.len { self.value } else { f64::NAN }
    }
}
