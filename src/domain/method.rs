//! Numeric expressions evaluated against a snapshot.
//!
//! A [`Method`] is an immutable value: two methods are equal when they are the
//! same variant with equal parameters, recursively. Evaluation builds the
//! matching series combinator over [`MethodSeries`] children and reads lookback
//! 0, so every sub-expression sees the snapshot shifted by the parent's lookback.

use crate::domain::history::{Field, Snapshot};
use crate::domain::registry::MethodContext;
use crate::domain::series::{
    Atr, Binary, BinaryOp, BollingerBands, Change, ColumnSeries, Divergence, DivergenceKind, Ema,
    FieldSeries, Highest, Hma, KeltnerChannel, KeltnerParams, Lowest, MaKind, Macd, Negate,
    OutputSelector, RangeKind, RelativeVolume, Rma, Roc, Rsi, Scaled, Series, Shift, Sma, StdDev,
    Stochastic, StochasticRsi, TrueRange, Wma,
};

/// Numeric parameters compare as floats, so a tree holding a NaN parameter is
/// not equal to itself. [`Strategy::validate`](crate::domain::strategy::Strategy::validate)
/// rejects such trees.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    Value(f64),
    /// An arbitrary named column.
    Data(String),
    Open,
    High,
    Low,
    Close,
    Volume,
    Change {
        source: Box<Method>,
    },
    Sma {
        source: Box<Method>,
        period: usize,
    },
    Ema {
        source: Box<Method>,
        period: usize,
    },
    Wma {
        source: Box<Method>,
        period: usize,
    },
    Rma {
        source: Box<Method>,
        period: usize,
    },
    Hma {
        source: Box<Method>,
        period: usize,
    },
    Rsi {
        source: Box<Method>,
        period: usize,
    },
    Roc {
        source: Box<Method>,
        period: usize,
    },
    Rvol {
        period: usize,
    },
    Atr {
        period: usize,
        multiplier: f64,
    },
    TrueRange,
    Highest {
        source: Box<Method>,
        period: usize,
    },
    Lowest {
        source: Box<Method>,
        period: usize,
    },
    StdDev {
        source: Box<Method>,
        period: usize,
    },
    Bb {
        ma_kind: MaKind,
        source: Box<Method>,
        period: usize,
        multiplier: f64,
    },
    Kc {
        ma_kind: MaKind,
        source: Box<Method>,
        ma_period: usize,
        range_kind: RangeKind,
        range_period: usize,
        multiplier: f64,
    },
    Macd {
        source: Box<Method>,
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stoch {
        k_period: usize,
        k_smooth: usize,
        d_period: usize,
    },
    StochRsi {
        source: Box<Method>,
        rsi_period: usize,
        k_period: usize,
        k_smooth: usize,
        d_period: usize,
    },
    BullishDivergence {
        signal: Box<Method>,
        reference: Box<Method>,
        pivot_range: usize,
        lookback_range: usize,
    },
    HiddenBullishDivergence {
        signal: Box<Method>,
        reference: Box<Method>,
        pivot_range: usize,
        lookback_range: usize,
    },
    /// Delegates to a method registered under this name.
    Reference(String),
    /// The source evaluated `period` bars further back.
    Lookback {
        source: Box<Method>,
        period: usize,
    },
    /// Reads one channel of a multi-output source.
    SelectOutput {
        source: Box<Method>,
        output: OutputSelector,
    },
    Add(Box<Method>, Box<Method>),
    Subtract(Box<Method>, Box<Method>),
    Multiply(Box<Method>, Box<Method>),
    Divide(Box<Method>, Box<Method>),
    AbsDiff(Box<Method>, Box<Method>),
    Negate(Box<Method>),
    Percentage {
        source: Box<Method>,
        percent: f64,
    },
}

impl Method {
    pub fn sma(source: Method, period: usize) -> Self {
        Method::Sma {
            source: Box::new(source),
            period,
        }
    }

    pub fn ema(source: Method, period: usize) -> Self {
        Method::Ema {
            source: Box::new(source),
            period,
        }
    }

    pub fn rsi(source: Method, period: usize) -> Self {
        Method::Rsi {
            source: Box::new(source),
            period,
        }
    }

    pub fn atr(period: usize, multiplier: f64) -> Self {
        Method::Atr { period, multiplier }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Method::Reference(name.into())
    }

    pub fn lookback(source: Method, period: usize) -> Self {
        Method::Lookback {
            source: Box::new(source),
            period,
        }
    }

    pub fn select_output(source: Method, output: OutputSelector) -> Self {
        Method::SelectOutput {
            source: Box::new(source),
            output,
        }
    }

    pub fn add(left: Method, right: Method) -> Self {
        Method::Add(Box::new(left), Box::new(right))
    }

    pub fn subtract(left: Method, right: Method) -> Self {
        Method::Subtract(Box::new(left), Box::new(right))
    }

    pub fn multiply(left: Method, right: Method) -> Self {
        Method::Multiply(Box::new(left), Box::new(right))
    }

    pub fn divide(left: Method, right: Method) -> Self {
        Method::Divide(Box::new(left), Box::new(right))
    }

    pub fn percentage(source: Method, percent: f64) -> Self {
        Method::Percentage {
            source: Box::new(source),
            percent,
        }
    }

    /// Upper-case kind name as used in strategy descriptions.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Method::Value(_) => "VALUE",
            Method::Data(_) => "DATA",
            Method::Open => "OPEN",
            Method::High => "HIGH",
            Method::Low => "LOW",
            Method::Close => "CLOSE",
            Method::Volume => "VOLUME",
            Method::Change { .. } => "CHANGE",
            Method::Sma { .. } => "SMA",
            Method::Ema { .. } => "EMA",
            Method::Wma { .. } => "WMA",
            Method::Rma { .. } => "RMA",
            Method::Hma { .. } => "HMA",
            Method::Rsi { .. } => "RSI",
            Method::Roc { .. } => "ROC",
            Method::Rvol { .. } => "RVOL",
            Method::Atr { .. } => "ATR",
            Method::TrueRange => "TR",
            Method::Highest { .. } => "HIGHEST",
            Method::Lowest { .. } => "LOWEST",
            Method::StdDev { .. } => "STDDEV",
            Method::Bb { .. } => "BB",
            Method::Kc { .. } => "KC",
            Method::Macd { .. } => "MACD",
            Method::Stoch { .. } => "STOCH",
            Method::StochRsi { .. } => "STOCH_RSI",
            Method::BullishDivergence { .. } => "BULLISH_DIVERGENCE",
            Method::HiddenBullishDivergence { .. } => "HIDDEN_BULLISH_DIVERGENCE",
            Method::Reference(_) => "REFERENCE",
            Method::Lookback { .. } => "LOOKBACK",
            Method::SelectOutput { .. } => "SELECT_OUTPUT",
            Method::Add(..) => "ADD",
            Method::Subtract(..) => "SUBTRACT",
            Method::Multiply(..) => "MULTIPLY",
            Method::Divide(..) => "DIVIDE",
            Method::AbsDiff(..) => "ABS_DIFF",
            Method::Negate(_) => "NEGATE",
            Method::Percentage { .. } => "PERCENTAGE",
        }
    }

    /// Value of the default channel at `snapshot`.
    pub fn evaluate(&self, snapshot: Snapshot<'_>, ctx: MethodContext<'_>) -> f64 {
        self.evaluate_output(snapshot, OutputSelector::Default, ctx)
    }

    /// Value of the `output` channel at `snapshot`; NaN for channels this
    /// method does not produce and for snapshots past the oldest sample.
    pub fn evaluate_output(
        &self,
        snapshot: Snapshot<'_>,
        output: OutputSelector,
        ctx: MethodContext<'_>,
    ) -> f64 {
        if snapshot.is_empty() {
            return f64::NAN;
        }
        let field = |f: Field| FieldSeries::new(snapshot, f);

        match self {
            Method::Value(value) => match output {
                OutputSelector::Default => *value,
                _ => f64::NAN,
            },
            Method::Data(name) => ColumnSeries::new(snapshot, name).get_output(0, output),
            Method::Open => field(Field::Open).get_output(0, output),
            Method::High => field(Field::High).get_output(0, output),
            Method::Low => field(Field::Low).get_output(0, output),
            Method::Close => field(Field::Close).get_output(0, output),
            Method::Volume => field(Field::Volume).get_output(0, output),
            Method::Change { source } => {
                Change::new(MethodSeries::new(source, snapshot, ctx)).get_output(0, output)
            }
            Method::Sma { source, period } => {
                Sma::new(MethodSeries::new(source, snapshot, ctx), *period).get_output(0, output)
            }
            Method::Ema { source, period } => {
                Ema::new(MethodSeries::new(source, snapshot, ctx), *period).get_output(0, output)
            }
            Method::Wma { source, period } => {
                Wma::new(MethodSeries::new(source, snapshot, ctx), *period).get_output(0, output)
            }
            Method::Rma { source, period } => {
                Rma::new(MethodSeries::new(source, snapshot, ctx), *period).get_output(0, output)
            }
            Method::Hma { source, period } => {
                Hma::new(MethodSeries::new(source, snapshot, ctx), *period).get_output(0, output)
            }
            Method::Rsi { source, period } => {
                Rsi::new(MethodSeries::new(source, snapshot, ctx), *period).get_output(0, output)
            }
            Method::Roc { source, period } => {
                Roc::new(MethodSeries::new(source, snapshot, ctx), *period).get_output(0, output)
            }
            Method::Rvol { period } => {
                RelativeVolume::new(field(Field::Volume), *period).get_output(0, output)
            }
            Method::Atr { period, multiplier } => Atr::new(
                field(Field::High),
                field(Field::Low),
                field(Field::Close),
                *period,
                *multiplier,
            )
            .get_output(0, output),
            Method::TrueRange => {
                TrueRange::new(field(Field::High), field(Field::Low), field(Field::Close))
                    .get_output(0, output)
            }
            Method::Highest { source, period } => {
                Highest::new(MethodSeries::new(source, snapshot, ctx), *period).get_output(0, output)
            }
            Method::Lowest { source, period } => {
                Lowest::new(MethodSeries::new(source, snapshot, ctx), *period).get_output(0, output)
            }
            Method::StdDev { source, period } => {
                StdDev::new(MethodSeries::new(source, snapshot, ctx), *period).get_output(0, output)
            }
            Method::Bb {
                ma_kind,
                source,
                period,
                multiplier,
            } => BollingerBands::new(
                *ma_kind,
                MethodSeries::new(source, snapshot, ctx),
                *period,
                *multiplier,
            )
            .get_output(0, output),
            Method::Kc {
                ma_kind,
                source,
                ma_period,
                range_kind,
                range_period,
                multiplier,
            } => {
                let params = KeltnerParams {
                    ma_kind: *ma_kind,
                    ma_period: *ma_period,
                    range_kind: *range_kind,
                    range_period: *range_period,
                    multiplier: *multiplier,
                };
                KeltnerChannel::new(
                    params,
                    MethodSeries::new(source, snapshot, ctx),
                    field(Field::High),
                    field(Field::Low),
                    field(Field::Close),
                )
                .get_output(0, output)
            }
            Method::Macd {
                source,
                fast,
                slow,
                signal,
            } => Macd::new(MethodSeries::new(source, snapshot, ctx), *fast, *slow, *signal)
                .get_output(0, output),
            Method::Stoch {
                k_period,
                k_smooth,
                d_period,
            } => Stochastic::new(
                field(Field::Close),
                field(Field::High),
                field(Field::Low),
                *k_period,
                *k_smooth,
                *d_period,
            )
            .get_output(0, output),
            Method::StochRsi {
                source,
                rsi_period,
                k_period,
                k_smooth,
                d_period,
            } => StochasticRsi::new(
                MethodSeries::new(source, snapshot, ctx),
                *rsi_period,
                *k_period,
                *k_smooth,
                *d_period,
            )
            .get_output(0, output),
            Method::BullishDivergence {
                signal,
                reference,
                pivot_range,
                lookback_range,
            } => Divergence::new(
                DivergenceKind::Bullish,
                MethodSeries::new(signal, snapshot, ctx),
                MethodSeries::new(reference, snapshot, ctx),
                *pivot_range,
                *lookback_range,
            )
            .get_output(0, output),
            Method::HiddenBullishDivergence {
                signal,
                reference,
                pivot_range,
                lookback_range,
            } => Divergence::new(
                DivergenceKind::HiddenBullish,
                MethodSeries::new(signal, snapshot, ctx),
                MethodSeries::new(reference, snapshot, ctx),
                *pivot_range,
                *lookback_range,
            )
            .get_output(0, output),
            Method::Reference(name) => ctx
                .resolve(name, |method, inner| method.evaluate_output(snapshot, output, inner))
                .unwrap_or(f64::NAN),
            Method::Lookback { source, period } => {
                Shift::new(MethodSeries::new(source, snapshot, ctx), *period).get_output(0, output)
            }
            Method::SelectOutput {
                source,
                output: selected,
            } => match output {
                OutputSelector::Default => source.evaluate_output(snapshot, *selected, ctx),
                _ => f64::NAN,
            },
            Method::Add(left, right) => binary(BinaryOp::Add, left, right, snapshot, output, ctx),
            Method::Subtract(left, right) => {
                binary(BinaryOp::Subtract, left, right, snapshot, output, ctx)
            }
            Method::Multiply(left, right) => {
                binary(BinaryOp::Multiply, left, right, snapshot, output, ctx)
            }
            Method::Divide(left, right) => {
                binary(BinaryOp::Divide, left, right, snapshot, output, ctx)
            }
            Method::AbsDiff(left, right) => {
                binary(BinaryOp::AbsDiff, left, right, snapshot, output, ctx)
            }
            Method::Negate(source) => {
                Negate::new(MethodSeries::new(source, snapshot, ctx)).get_output(0, output)
            }
            Method::Percentage { source, percent } => {
                Scaled::percentage(MethodSeries::new(source, snapshot, ctx), *percent)
                    .get_output(0, output)
            }
        }
    }

    /// Direct sub-expressions.
    pub fn children(&self) -> Vec<&Method> {
        match self {
            Method::Value(_)
            | Method::Data(_)
            | Method::Open
            | Method::High
            | Method::Low
            | Method::Close
            | Method::Volume
            | Method::Rvol { .. }
            | Method::Atr { .. }
            | Method::TrueRange
            | Method::Stoch { .. }
            | Method::Reference(_) => Vec::new(),
            Method::Change { source }
            | Method::Sma { source, .. }
            | Method::Ema { source, .. }
            | Method::Wma { source, .. }
            | Method::Rma { source, .. }
            | Method::Hma { source, .. }
            | Method::Rsi { source, .. }
            | Method::Roc { source, .. }
            | Method::Highest { source, .. }
            | Method::Lowest { source, .. }
            | Method::StdDev { source, .. }
            | Method::Bb { source, .. }
            | Method::Kc { source, .. }
            | Method::Macd { source, .. }
            | Method::StochRsi { source, .. }
            | Method::Lookback { source, .. }
            | Method::SelectOutput { source, .. }
            | Method::Negate(source)
            | Method::Percentage { source, .. } => vec![&**source],
            Method::BullishDivergence {
                signal, reference, ..
            }
            | Method::HiddenBullishDivergence {
                signal, reference, ..
            } => vec![&**signal, &**reference],
            Method::Add(left, right)
            | Method::Subtract(left, right)
            | Method::Multiply(left, right)
            | Method::Divide(left, right)
            | Method::AbsDiff(left, right) => vec![&**left, &**right],
        }
    }

    /// Numeric parameters anywhere in this expression, in visit order.
    pub fn constants(&self) -> Vec<f64> {
        let mut values = Vec::new();
        let mut stack = vec![self];
        while let Some(method) = stack.pop() {
            match method {
                Method::Value(v) | Method::Percentage { percent: v, .. } => values.push(*v),
                Method::Atr { multiplier, .. }
                | Method::Bb { multiplier, .. }
                | Method::Kc { multiplier, .. } => values.push(*multiplier),
                _ => {}
            }
            stack.extend(method.children().into_iter().rev());
        }
        values
    }

    /// Names referenced anywhere in this expression, in visit order.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut stack = vec![self];
        while let Some(method) = stack.pop() {
            if let Method::Reference(name) = method {
                names.push(name.as_str());
            }
            stack.extend(method.children().into_iter().rev());
        }
        names
    }
}

fn binary(
    op: BinaryOp,
    left: &Method,
    right: &Method,
    snapshot: Snapshot<'_>,
    output: OutputSelector,
    ctx: MethodContext<'_>,
) -> f64 {
    Binary::new(
        op,
        MethodSeries::new(left, snapshot, ctx),
        MethodSeries::new(right, snapshot, ctx),
    )
    .get_output(0, output)
}

/// A method viewed as a series: lookback `k` evaluates the method at the
/// snapshot `k` bars further back.
#[derive(Debug, Clone, Copy)]
pub struct MethodSeries<'a> {
    method: &'a Method,
    snapshot: Snapshot<'a>,
    ctx: MethodContext<'a>,
}

impl<'a> MethodSeries<'a> {
    pub fn new(method: &'a Method, snapshot: Snapshot<'a>, ctx: MethodContext<'a>) -> Self {
        MethodSeries {
            method,
            snapshot,
            ctx,
        }
    }
}

impl Series for MethodSeries<'_> {
    fn len(&self) -> usize {
        self.snapshot.len()
    }

    fn get(&self, lookback: usize) -> f64 {
        self.get_output(lookback, OutputSelector::Default)
    }

    fn get_output(&self, lookback: usize, output: OutputSelector) -> f64 {
        if lookback >= self.len() {
            return f64::NAN;
        }
        self.method
            .evaluate_output(self.snapshot.at(lookback), output, self.ctx)
    }
}
