//! JSON strategy description adapter.
//!
//! A method node is `{"method": KIND, ...params}`, a bare number (`VALUE`) or
//! a bare string naming a kind whose parameters all have defaults. A filter
//! node is `{"filter": KIND, ...params}` or a bare boolean. Errors carry the
//! dotted path of the offending node, e.g. `longPosition.entry.conditions[0].target`.

use crate::domain::error::{ParseError, TatraderError};
use crate::domain::filter::Filter;
use crate::domain::method::Method;
use crate::domain::registry::Registry;
use crate::domain::series::{MaKind, OutputSelector, RangeKind};
use crate::domain::strategy::{DirectionRules, StopLoss, Strategy, TakeProfit};
use crate::ports::strategy_port::StrategyPort;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;

pub struct JsonStrategyAdapter {
    source: String,
    name: String,
}

impl JsonStrategyAdapter {
    /// Read a strategy file; the file stem names the strategy unless the
    /// document sets `name`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TatraderError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "strategy".to_string());
        Ok(Self { source, name })
    }

    pub fn from_string(content: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: content.into(),
            name: name.into(),
        }
    }
}

impl StrategyPort for JsonStrategyAdapter {
    fn load_strategy(&self) -> Result<Strategy, TatraderError> {
        let strategy = parse_strategy(&self.source, &self.name)?;
        tracing::debug!(
            strategy = %strategy.name,
            series = strategy.registry.len(),
            long = strategy.long.is_some(),
            short = strategy.short.is_some(),
            "strategy loaded"
        );
        Ok(strategy)
    }
}

fn error(path: &str, message: impl Into<String>) -> ParseError {
    ParseError::new(if path.is_empty() { "$" } else { path }, message)
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn as_number(value: &Value, path: &str) -> Result<f64, ParseError> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| error(path, "expected a number"))
}

fn as_count(value: &Value, path: &str, minimum: usize) -> Result<usize, ParseError> {
    value
        .as_f64()
        .filter(|v| v.fract() == 0.0 && *v >= minimum as f64 && *v <= u32::MAX as f64)
        .map(|v| v as usize)
        .ok_or_else(|| {
            if minimum == 0 {
                error(path, "expected a non-negative integer")
            } else {
                error(path, "expected a positive integer")
            }
        })
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ParseError> {
    value
        .as_object()
        .ok_or_else(|| error(path, "expected an object"))
}

/// Parameter lookups on one JSON object, with the object's path for errors.
struct Params<'a> {
    obj: Option<&'a Map<String, Value>>,
    path: String,
}

impl<'a> Params<'a> {
    fn new(obj: &'a Map<String, Value>, path: &str) -> Self {
        Self {
            obj: Some(obj),
            path: path.to_string(),
        }
    }

    /// A bare-string node: every parameter takes its default.
    fn empty(path: &str) -> Self {
        Self {
            obj: None,
            path: path.to_string(),
        }
    }

    fn key_path(&self, key: &str) -> String {
        join(&self.path, key)
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.obj.and_then(|obj| obj.get(key))
    }

    fn require(&self, key: &str) -> Result<&'a Value, ParseError> {
        self.get(key)
            .ok_or_else(|| error(&self.key_path(key), "missing field"))
    }

    fn method(&self, key: &str, default: Method) -> Result<Box<Method>, ParseError> {
        match self.get(key) {
            Some(value) => method_at(value, &self.key_path(key)).map(Box::new),
            None => Ok(Box::new(default)),
        }
    }

    fn required_method(&self, key: &str) -> Result<Box<Method>, ParseError> {
        method_at(self.require(key)?, &self.key_path(key)).map(Box::new)
    }

    fn number(&self, key: &str, default: f64) -> Result<f64, ParseError> {
        match self.get(key) {
            Some(value) => as_number(value, &self.key_path(key)),
            None => Ok(default),
        }
    }

    fn period(&self, key: &str, default: usize) -> Result<usize, ParseError> {
        match self.get(key) {
            Some(value) => as_count(value, &self.key_path(key), 1),
            None => Ok(default),
        }
    }

    fn string(&self, key: &str) -> Result<Option<&'a str>, ParseError> {
        match self.get(key) {
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| error(&self.key_path(key), "expected a string")),
            None => Ok(None),
        }
    }

    fn required_string(&self, key: &str) -> Result<&'a str, ParseError> {
        self.string(key)?
            .ok_or_else(|| error(&self.key_path(key), "missing field"))
    }

    fn ma_kind(&self, key: &str, default: MaKind) -> Result<MaKind, ParseError> {
        match self.string(key)? {
            Some(name) => MaKind::from_name(name).ok_or_else(|| {
                error(
                    &self.key_path(key),
                    format!("unknown moving average type {name:?}"),
                )
            }),
            None => Ok(default),
        }
    }

    fn range_kind(&self, key: &str, default: RangeKind) -> Result<RangeKind, ParseError> {
        match self.string(key)? {
            Some(name) => RangeKind::from_name(name).ok_or_else(|| {
                error(&self.key_path(key), format!("unknown range type {name:?}"))
            }),
            None => Ok(default),
        }
    }

    fn filter(&self, key: &str) -> Result<Box<Filter>, ParseError> {
        filter_at(self.require(key)?, &self.key_path(key)).map(Box::new)
    }
}

/// Parse a standalone method node.
pub fn parse_method(value: &Value) -> Result<Method, ParseError> {
    method_at(value, "")
}

/// Parse a standalone filter node.
pub fn parse_filter(value: &Value) -> Result<Filter, ParseError> {
    filter_at(value, "")
}

fn method_at(value: &Value, path: &str) -> Result<Method, ParseError> {
    match value {
        Value::Number(_) => as_number(value, path).map(Method::Value),
        Value::String(kind) => method_kind(kind, &Params::empty(path)),
        Value::Object(obj) => {
            let params = Params::new(obj, path);
            let kind = params.required_string("method")?;
            method_kind(kind, &params)
        }
        _ => Err(error(path, "expected a method")),
    }
}

fn method_kind(kind: &str, p: &Params<'_>) -> Result<Method, ParseError> {
    let source = || p.method("source", Method::Close);
    let period = || p.period("period", 14);

    let method = match kind.to_ascii_uppercase().as_str() {
        "VALUE" => Method::Value(as_number(p.require("value")?, &p.key_path("value"))?),
        "DATA" => Method::Data(p.required_string("field")?.to_string()),
        "OPEN" => Method::Open,
        "HIGH" => Method::High,
        "LOW" => Method::Low,
        "CLOSE" => Method::Close,
        "VOLUME" => Method::Volume,
        "CHANGE" => Method::Change { source: source()? },
        "SMA" => Method::Sma {
            source: source()?,
            period: period()?,
        },
        "EMA" => Method::Ema {
            source: source()?,
            period: period()?,
        },
        "WMA" => Method::Wma {
            source: source()?,
            period: period()?,
        },
        "RMA" => Method::Rma {
            source: source()?,
            period: period()?,
        },
        "HMA" => Method::Hma {
            source: source()?,
            period: period()?,
        },
        "RSI" => Method::Rsi {
            source: source()?,
            period: period()?,
        },
        "ROC" => Method::Roc {
            source: source()?,
            period: period()?,
        },
        "HIGHEST" => Method::Highest {
            source: source()?,
            period: period()?,
        },
        "LOWEST" => Method::Lowest {
            source: source()?,
            period: period()?,
        },
        "STDDEV" => Method::StdDev {
            source: source()?,
            period: period()?,
        },
        "RVOL" => Method::Rvol { period: period()? },
        "ATR" => Method::Atr {
            period: period()?,
            multiplier: p.number("multiplier", 1.0)?,
        },
        "TR" | "TRUE_RANGE" => Method::TrueRange,
        "BB" => Method::Bb {
            ma_kind: p.ma_kind("maType", MaKind::Sma)?,
            source: p.method("maSource", Method::Close)?,
            period: p.period("period", 20)?,
            multiplier: p.number("stddev", 2.0)?,
        },
        "KC" => Method::Kc {
            ma_kind: p.ma_kind("maType", MaKind::Ema)?,
            source: source()?,
            ma_period: p.period("maPeriod", 20)?,
            range_kind: p.range_kind("rangeType", RangeKind::Atr)?,
            range_period: p.period("rangePeriod", 10)?,
            multiplier: p.number("multiplier", 2.0)?,
        },
        "MACD" => Method::Macd {
            source: source()?,
            fast: p.period("fast", 12)?,
            slow: p.period("slow", 26)?,
            signal: p.period("signal", 9)?,
        },
        "STOCH" => Method::Stoch {
            k_period: p.period("kPeriod", 5)?,
            k_smooth: p.period("kSmooth", 3)?,
            d_period: p.period("dPeriod", 3)?,
        },
        "STOCH_RSI" => Method::StochRsi {
            source: p.method("rsiSource", Method::Close)?,
            rsi_period: p.period("rsiPeriod", 14)?,
            k_period: p.period("kPeriod", 5)?,
            k_smooth: p.period("kSmooth", 3)?,
            d_period: p.period("dPeriod", 3)?,
        },
        "BULLISH_DIVERGENCE" => Method::BullishDivergence {
            signal: p.method("signal", Method::rsi(Method::Close, 14))?,
            reference: p.method("reference", Method::Close)?,
            pivot_range: p.period("pivotRange", 5)?,
            lookback_range: p.period("lookbackRange", 60)?,
        },
        "HIDDEN_BULLISH_DIVERGENCE" => Method::HiddenBullishDivergence {
            signal: p.method("signal", Method::rsi(Method::Close, 14))?,
            reference: p.method("reference", Method::Close)?,
            pivot_range: p.period("pivotRange", 5)?,
            lookback_range: p.period("lookbackRange", 60)?,
        },
        "REFERENCE" => Method::Reference(p.required_string("name")?.to_string()),
        "LOOKBACK" => Method::Lookback {
            source: source()?,
            period: as_count(p.require("period")?, &p.key_path("period"), 0)?,
        },
        "SELECT_OUTPUT" => {
            let name = p.string("name")?.unwrap_or("default");
            let output = OutputSelector::from_name(name).ok_or_else(|| {
                error(&p.key_path("name"), format!("unknown output {name:?}"))
            })?;
            Method::SelectOutput {
                source: p.required_method("source")?,
                output,
            }
        }
        "ADD" => Method::Add(p.required_method("augend")?, p.required_method("addend")?),
        "SUBTRACT" => Method::Subtract(
            p.required_method("minuend")?,
            p.required_method("subtrahend")?,
        ),
        "MULTIPLY" => Method::Multiply(
            p.required_method("multiplicand")?,
            p.required_method("multiplier")?,
        ),
        "DIVIDE" => Method::Divide(p.required_method("dividend")?, p.required_method("divisor")?),
        "ABS_DIFF" => Method::AbsDiff(
            p.required_method("minuend")?,
            p.required_method("subtrahend")?,
        ),
        "NEGATE" => Method::Negate(p.required_method("operand")?),
        "PERCENTAGE" => Method::Percentage {
            source: p.method("base", Method::Close)?,
            percent: p.number("percent", 100.0)?,
        },
        _ => {
            let path = if p.obj.is_some() {
                p.key_path("method")
            } else {
                p.path.clone()
            };
            return Err(error(&path, format!("unknown method {kind:?}")));
        }
    };
    Ok(method)
}

fn filter_at(value: &Value, path: &str) -> Result<Filter, ParseError> {
    match value {
        Value::Bool(true) => Ok(Filter::True),
        Value::Bool(false) => Ok(Filter::False),
        Value::String(kind) => filter_kind(kind, &Params::empty(path)),
        Value::Object(obj) => {
            let params = Params::new(obj, path);
            let kind = params.required_string("filter")?;
            filter_kind(kind, &params)
        }
        _ => Err(error(path, "expected a filter")),
    }
}

fn filter_list(p: &Params<'_>) -> Result<Vec<Filter>, ParseError> {
    let path = p.key_path("conditions");
    let items = p
        .require("conditions")?
        .as_array()
        .ok_or_else(|| error(&path, "expected an array"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| filter_at(item, &format!("{path}[{i}]")))
        .collect()
}

fn filter_kind(kind: &str, p: &Params<'_>) -> Result<Filter, ParseError> {
    let operands = || -> Result<(Method, Method), ParseError> {
        Ok((
            *p.required_method("target")?,
            *p.required_method("threshold")?,
        ))
    };
    let crossing = || -> Result<(Method, Method), ParseError> {
        Ok((
            *p.required_method("signal")?,
            *p.required_method("reference")?,
        ))
    };

    let filter = match kind.to_ascii_uppercase().as_str() {
        "TRUE" => Filter::True,
        "FALSE" => Filter::False,
        "ALL_OF" => Filter::AllOf(filter_list(p)?),
        "ANY_OF" => Filter::AnyOf(filter_list(p)?),
        "AND" => Filter::And(p.filter("firstCondition")?, p.filter("secondCondition")?),
        "OR" => Filter::Or(p.filter("firstCondition")?, p.filter("secondCondition")?),
        "XOR" => Filter::Xor(p.filter("firstCondition")?, p.filter("secondCondition")?),
        "NOT" => Filter::Not(p.filter("condition")?),
        "GREATER_THAN" => {
            let (target, threshold) = operands()?;
            Filter::GreaterThan { target, threshold }
        }
        "GREATER_EQUAL" => {
            let (target, threshold) = operands()?;
            Filter::GreaterEqual { target, threshold }
        }
        "LESS_THAN" => {
            let (target, threshold) = operands()?;
            Filter::LessThan { target, threshold }
        }
        "LESS_EQUAL" => {
            let (target, threshold) = operands()?;
            Filter::LessEqual { target, threshold }
        }
        "EQUAL" => {
            let (target, threshold) = operands()?;
            Filter::Equal { target, threshold }
        }
        "NOT_EQUAL" => {
            let (target, threshold) = operands()?;
            Filter::NotEqual { target, threshold }
        }
        "CROSSOVER" => {
            let (signal, reference) = crossing()?;
            Filter::Crossover { signal, reference }
        }
        "CROSSUNDER" => {
            let (signal, reference) = crossing()?;
            Filter::Crossunder { signal, reference }
        }
        _ => {
            let path = if p.obj.is_some() {
                p.key_path("filter")
            } else {
                p.path.clone()
            };
            return Err(error(&path, format!("unknown filter {kind:?}")));
        }
    };
    Ok(filter)
}

/// Risk accepts a method node or one of the `ATR`, `PERCENTAGE` and `VALUE`
/// shorthands.
fn parse_risk(value: &Value, path: &str) -> Result<Method, ParseError> {
    let Some(obj) = value.as_object() else {
        return method_at(value, path);
    };
    if obj.contains_key("method") || obj.len() != 1 {
        return method_at(value, path);
    }
    let Some((key, body)) = obj.iter().next() else {
        return method_at(value, path);
    };
    let inner = join(path, key);
    let scalar_or = |field: &str, default: f64| -> Result<f64, ParseError> {
        match body {
            Value::Number(_) => as_number(body, &inner),
            Value::Object(params) => Params::new(params, &inner).number(field, default),
            _ => Err(error(&inner, "expected a number or an object")),
        }
    };

    match key.to_ascii_uppercase().as_str() {
        "ATR" => {
            let params = Params::new(as_object(body, &inner)?, &inner);
            Ok(Method::atr(
                params.period("period", 14)?,
                params.number("multiplier", 1.0)?,
            ))
        }
        "PERCENTAGE" => Ok(Method::Percentage {
            source: Box::new(Method::Close),
            percent: scalar_or("percent", 1.0)?,
        }),
        "VALUE" => Ok(Method::Value(scalar_or("value", f64::NAN)?)),
        _ => method_at(value, path),
    }
}

/// A direction block is `{entry, exit}`; either side may also be wrapped as
/// `{"signal": filter}`. A missing exit never fires.
fn parse_direction(value: &Value, path: &str) -> Result<DirectionRules, ParseError> {
    let params = Params::new(as_object(value, path)?, path);
    let side = |key: &str, default: Option<Filter>| -> Result<Filter, ParseError> {
        let key_path = params.key_path(key);
        let node = match (params.get(key), default) {
            (Some(node), _) => node,
            (None, Some(default)) => return Ok(default),
            (None, None) => return Err(error(&key_path, "missing field")),
        };
        match node.as_object().and_then(|obj| obj.get("signal")) {
            Some(signal) if !node.as_object().is_some_and(|o| o.contains_key("filter")) => {
                filter_at(signal, &join(&key_path, "signal"))
            }
            _ => filter_at(node, &key_path),
        }
    };
    Ok(DirectionRules {
        entry: side("entry", None)?,
        exit: side("exit", Some(Filter::False))?,
    })
}

fn parse_stop_loss(value: &Value, path: &str) -> Result<StopLoss, ParseError> {
    match value {
        Value::Bool(enabled) => Ok(StopLoss {
            enabled: *enabled,
            trailing: false,
        }),
        Value::Object(obj) => {
            let params = Params::new(obj, path);
            Ok(StopLoss {
                enabled: flag(&params, "enabled", true)?,
                trailing: flag(&params, "isTrailing", false)?,
            })
        }
        _ => Err(error(path, "expected a boolean or an object")),
    }
}

fn parse_take_profit(value: &Value, path: &str, risk: &Method) -> Result<TakeProfit, ParseError> {
    match value {
        Value::Bool(true) => Ok(TakeProfit::risk_multiple(risk, 1.0)),
        Value::Bool(false) => Ok(TakeProfit::default()),
        Value::Object(obj) => {
            let params = Params::new(obj, path);
            if !flag(&params, "enabled", true)? {
                return Ok(TakeProfit::default());
            }
            if params.get("reward").is_some() {
                return Ok(TakeProfit {
                    enabled: true,
                    reward: *params.required_method("reward")?,
                });
            }
            Ok(TakeProfit::risk_multiple(
                risk,
                params.number("riskMultiplier", 1.0)?,
            ))
        }
        _ => Err(error(path, "expected a boolean or an object")),
    }
}

fn flag(params: &Params<'_>, key: &str, default: bool) -> Result<bool, ParseError> {
    match params.get(key) {
        Some(value) => value
            .as_bool()
            .ok_or_else(|| error(&params.key_path(key), "expected a boolean")),
        None => Ok(default),
    }
}

/// Parse a strategy document. `default_name` applies when the document has
/// no `name`.
pub fn parse_strategy(json: &str, default_name: &str) -> Result<Strategy, ParseError> {
    let root: Value =
        serde_json::from_str(json).map_err(|e| error("", format!("invalid JSON: {e}")))?;
    let params = Params::new(as_object(&root, "")?, "");

    let name = params.string("name")?.unwrap_or(default_name);
    let risk = parse_risk(params.require("risk")?, "risk")?;
    let mut strategy = Strategy::new(name, risk);

    if let Some(series) = params.get("series") {
        let mut registry = Registry::new();
        for (key, node) in as_object(series, "series")? {
            registry.insert(key.clone(), method_at(node, &join("series", key))?);
        }
        strategy.registry = registry;
    }

    if let Some(node) = params.get("longPosition") {
        strategy.long = Some(parse_direction(node, "longPosition")?);
    }
    if let Some(node) = params.get("shortPosition") {
        strategy.short = Some(parse_direction(node, "shortPosition")?);
    }
    if let Some(node) = params.get("stopLoss") {
        strategy.stop_loss = parse_stop_loss(node, "stopLoss")?;
    }
    if let Some(node) = params.get("takeProfit") {
        strategy.take_profit = parse_take_profit(node, "takeProfit", &strategy.risk)?;
    }
    strategy.entry_price = *params.method("entryPrice", Method::Close)?;
    strategy.exit_price = *params.method("exitPrice", Method::Close)?;

    Ok(strategy)
}

/// Serialize a method with every parameter spelled out.
pub fn method_to_json(method: &Method) -> Value {
    let mut obj = Map::new();
    obj.insert("method".to_string(), json!(method.kind_name()));
    let mut put = |key: &str, value: Value| {
        obj.insert(key.to_string(), value);
    };

    match method {
        Method::Value(v) => put("value", json!(v)),
        Method::Data(field) => put("field", json!(field)),
        Method::Open
        | Method::High
        | Method::Low
        | Method::Close
        | Method::Volume
        | Method::TrueRange => {}
        Method::Change { source } => put("source", method_to_json(source)),
        Method::Sma { source, period }
        | Method::Ema { source, period }
        | Method::Wma { source, period }
        | Method::Rma { source, period }
        | Method::Hma { source, period }
        | Method::Rsi { source, period }
        | Method::Roc { source, period }
        | Method::Highest { source, period }
        | Method::Lowest { source, period }
        | Method::StdDev { source, period }
        | Method::Lookback { source, period } => {
            put("source", method_to_json(source));
            put("period", json!(period));
        }
        Method::Rvol { period } => put("period", json!(period)),
        Method::Atr { period, multiplier } => {
            put("period", json!(period));
            put("multiplier", json!(multiplier));
        }
        Method::Bb {
            ma_kind,
            source,
            period,
            multiplier,
        } => {
            put("maType", json!(ma_kind.name()));
            put("maSource", method_to_json(source));
            put("period", json!(period));
            put("stddev", json!(multiplier));
        }
        Method::Kc {
            ma_kind,
            source,
            ma_period,
            range_kind,
            range_period,
            multiplier,
        } => {
            put("maType", json!(ma_kind.name()));
            put("source", method_to_json(source));
            put("maPeriod", json!(ma_period));
            put("rangeType", json!(range_kind.name()));
            put("rangePeriod", json!(range_period));
            put("multiplier", json!(multiplier));
        }
        Method::Macd {
            source,
            fast,
            slow,
            signal,
        } => {
            put("source", method_to_json(source));
            put("fast", json!(fast));
            put("slow", json!(slow));
            put("signal", json!(signal));
        }
        Method::Stoch {
            k_period,
            k_smooth,
            d_period,
        } => {
            put("kPeriod", json!(k_period));
            put("kSmooth", json!(k_smooth));
            put("dPeriod", json!(d_period));
        }
        Method::StochRsi {
            source,
            rsi_period,
            k_period,
            k_smooth,
            d_period,
        } => {
            put("rsiSource", method_to_json(source));
            put("rsiPeriod", json!(rsi_period));
            put("kPeriod", json!(k_period));
            put("kSmooth", json!(k_smooth));
            put("dPeriod", json!(d_period));
        }
        Method::BullishDivergence {
            signal,
            reference,
            pivot_range,
            lookback_range,
        }
        | Method::HiddenBullishDivergence {
            signal,
            reference,
            pivot_range,
            lookback_range,
        } => {
            put("signal", method_to_json(signal));
            put("reference", method_to_json(reference));
            put("pivotRange", json!(pivot_range));
            put("lookbackRange", json!(lookback_range));
        }
        Method::Reference(name) => put("name", json!(name)),
        Method::SelectOutput { source, output } => {
            put("name", json!(output.name()));
            put("source", method_to_json(source));
        }
        Method::Add(a, b) => {
            put("augend", method_to_json(a));
            put("addend", method_to_json(b));
        }
        Method::Subtract(a, b) | Method::AbsDiff(a, b) => {
            put("minuend", method_to_json(a));
            put("subtrahend", method_to_json(b));
        }
        Method::Multiply(a, b) => {
            put("multiplicand", method_to_json(a));
            put("multiplier", method_to_json(b));
        }
        Method::Divide(a, b) => {
            put("dividend", method_to_json(a));
            put("divisor", method_to_json(b));
        }
        Method::Negate(operand) => put("operand", method_to_json(operand)),
        Method::Percentage { source, percent } => {
            put("base", method_to_json(source));
            put("percent", json!(percent));
        }
    }
    Value::Object(obj)
}

pub fn filter_to_json(filter: &Filter) -> Value {
    let mut obj = Map::new();
    obj.insert("filter".to_string(), json!(filter.kind_name()));
    let mut put = |key: &str, value: Value| {
        obj.insert(key.to_string(), value);
    };

    match filter {
        Filter::True | Filter::False => {}
        Filter::AllOf(conditions) | Filter::AnyOf(conditions) => {
            put(
                "conditions",
                Value::Array(conditions.iter().map(filter_to_json).collect()),
            );
        }
        Filter::And(first, second) | Filter::Or(first, second) | Filter::Xor(first, second) => {
            put("firstCondition", filter_to_json(first));
            put("secondCondition", filter_to_json(second));
        }
        Filter::Not(condition) => put("condition", filter_to_json(condition)),
        Filter::GreaterThan { target, threshold }
        | Filter::GreaterEqual { target, threshold }
        | Filter::LessThan { target, threshold }
        | Filter::LessEqual { target, threshold }
        | Filter::Equal { target, threshold }
        | Filter::NotEqual { target, threshold } => {
            put("target", method_to_json(target));
            put("threshold", method_to_json(threshold));
        }
        Filter::Crossover { signal, reference } | Filter::Crossunder { signal, reference } => {
            put("signal", method_to_json(signal));
            put("reference", method_to_json(reference));
        }
    }
    Value::Object(obj)
}

pub fn strategy_to_json(strategy: &Strategy) -> Value {
    let series: Map<String, Value> = strategy
        .registry
        .iter()
        .map(|(name, method)| (name.to_string(), method_to_json(method)))
        .collect();
    let direction = |rules: &DirectionRules| {
        json!({
            "entry": filter_to_json(&rules.entry),
            "exit": filter_to_json(&rules.exit),
        })
    };

    let mut obj = Map::new();
    obj.insert("name".to_string(), json!(strategy.name));
    obj.insert("series".to_string(), Value::Object(series));
    obj.insert("risk".to_string(), method_to_json(&strategy.risk));
    if let Some(rules) = &strategy.long {
        obj.insert("longPosition".to_string(), direction(rules));
    }
    if let Some(rules) = &strategy.short {
        obj.insert("shortPosition".to_string(), direction(rules));
    }
    obj.insert(
        "stopLoss".to_string(),
        json!({
            "enabled": strategy.stop_loss.enabled,
            "isTrailing": strategy.stop_loss.trailing,
        }),
    );
    let take_profit = if strategy.take_profit.enabled {
        json!({
            "enabled": true,
            "reward": method_to_json(&strategy.take_profit.reward),
        })
    } else {
        json!({ "enabled": false })
    };
    obj.insert("takeProfit".to_string(), take_profit);
    obj.insert("entryPrice".to_string(), method_to_json(&strategy.entry_price));
    obj.insert("exitPrice".to_string(), method_to_json(&strategy.exit_price));
    Value::Object(obj)
}
