//! Boolean conditions over methods.
//!
//! - Comparisons evaluate both methods at the same snapshot; any NaN operand
//!   makes the comparison false.
//! - `Equal`/`NotEqual` use an absolute tolerance of `1e-9`.
//! - `Crossover` holds when `signal > reference` now and `signal <= reference`
//!   one bar earlier; `Crossunder` mirrors it.
//! - An empty `AllOf` is true, an empty `AnyOf` is false.

use crate::domain::history::Snapshot;
use crate::domain::method::Method;
use crate::domain::registry::MethodContext;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    False,
    AllOf(Vec<Filter>),
    AnyOf(Vec<Filter>),
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Xor(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
    GreaterThan { target: Method, threshold: Method },
    GreaterEqual { target: Method, threshold: Method },
    LessThan { target: Method, threshold: Method },
    LessEqual { target: Method, threshold: Method },
    Equal { target: Method, threshold: Method },
    NotEqual { target: Method, threshold: Method },
    Crossover { signal: Method, reference: Method },
    Crossunder { signal: Method, reference: Method },
}

impl Filter {
    pub fn and(first: Filter, second: Filter) -> Self {
        Filter::And(Box::new(first), Box::new(second))
    }

    pub fn or(first: Filter, second: Filter) -> Self {
        Filter::Or(Box::new(first), Box::new(second))
    }

    pub fn xor(first: Filter, second: Filter) -> Self {
        Filter::Xor(Box::new(first), Box::new(second))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Filter) -> Self {
        Filter::Not(Box::new(condition))
    }

    pub fn greater_than(target: Method, threshold: Method) -> Self {
        Filter::GreaterThan { target, threshold }
    }

    pub fn less_than(target: Method, threshold: Method) -> Self {
        Filter::LessThan { target, threshold }
    }

    pub fn crossover(signal: Method, reference: Method) -> Self {
        Filter::Crossover { signal, reference }
    }

    pub fn crossunder(signal: Method, reference: Method) -> Self {
        Filter::Crossunder { signal, reference }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Filter::True => "TRUE",
            Filter::False => "FALSE",
            Filter::AllOf(_) => "ALL_OF",
            Filter::AnyOf(_) => "ANY_OF",
            Filter::And(..) => "AND",
            Filter::Or(..) => "OR",
            Filter::Xor(..) => "XOR",
            Filter::Not(_) => "NOT",
            Filter::GreaterThan { .. } => "GREATER_THAN",
            Filter::GreaterEqual { .. } => "GREATER_EQUAL",
            Filter::LessThan { .. } => "LESS_THAN",
            Filter::LessEqual { .. } => "LESS_EQUAL",
            Filter::Equal { .. } => "EQUAL",
            Filter::NotEqual { .. } => "NOT_EQUAL",
            Filter::Crossover { .. } => "CROSSOVER",
            Filter::Crossunder { .. } => "CROSSUNDER",
        }
    }

    /// Every method operand in this filter tree, depth first.
    pub fn methods(&self) -> Vec<&Method> {
        let mut out = Vec::new();
        self.collect_methods(&mut out);
        out
    }

    fn collect_methods<'a>(&'a self, out: &mut Vec<&'a Method>) {
        match self {
            Filter::True | Filter::False => {}
            Filter::AllOf(conditions) | Filter::AnyOf(conditions) => {
                for condition in conditions {
                    condition.collect_methods(out);
                }
            }
            Filter::And(first, second) | Filter::Or(first, second) | Filter::Xor(first, second) => {
                first.collect_methods(out);
                second.collect_methods(out);
            }
            Filter::Not(condition) => condition.collect_methods(out),
            Filter::GreaterThan { target, threshold }
            | Filter::GreaterEqual { target, threshold }
            | Filter::LessThan { target, threshold }
            | Filter::LessEqual { target, threshold }
            | Filter::Equal { target, threshold }
            | Filter::NotEqual { target, threshold } => {
                out.push(target);
                out.push(threshold);
            }
            Filter::Crossover { signal, reference } | Filter::Crossunder { signal, reference } => {
                out.push(signal);
                out.push(reference);
            }
        }
    }

    pub fn evaluate(&self, snapshot: Snapshot<'_>, ctx: MethodContext<'_>) -> bool {
        let both = |a: &Method, b: &Method| (a.evaluate(snapshot, ctx), b.evaluate(snapshot, ctx));

        match self {
            Filter::True => true,
            Filter::False => false,
            Filter::AllOf(conditions) => conditions.iter().all(|f| f.evaluate(snapshot, ctx)),
            Filter::AnyOf(conditions) => conditions.iter().any(|f| f.evaluate(snapshot, ctx)),
            Filter::And(first, second) => {
                first.evaluate(snapshot, ctx) && second.evaluate(snapshot, ctx)
            }
            Filter::Or(first, second) => {
                first.evaluate(snapshot, ctx) || second.evaluate(snapshot, ctx)
            }
            Filter::Xor(first, second) => {
                first.evaluate(snapshot, ctx) != second.evaluate(snapshot, ctx)
            }
            Filter::Not(condition) => !condition.evaluate(snapshot, ctx),
            Filter::GreaterThan { target, threshold } => {
                let (t, h) = both(target, threshold);
                t > h
            }
            Filter::GreaterEqual { target, threshold } => {
                let (t, h) = both(target, threshold);
                t >= h
            }
            Filter::LessThan { target, threshold } => {
                let (t, h) = both(target, threshold);
                t < h
            }
            Filter::LessEqual { target, threshold } => {
                let (t, h) = both(target, threshold);
                t <= h
            }
            Filter::Equal { target, threshold } => {
                let (t, h) = both(target, threshold);
                approx_equal(t, h)
            }
            Filter::NotEqual { target, threshold } => {
                let (t, h) = both(target, threshold);
                !t.is_nan() && !h.is_nan() && !approx_equal(t, h)
            }
            Filter::Crossover { signal, reference } => {
                let (s, r) = both(signal, reference);
                let prev = snapshot.at(1);
                let (s_prev, r_prev) = (signal.evaluate(prev, ctx), reference.evaluate(prev, ctx));
                s > r && s_prev <= r_prev
            }
            Filter::Crossunder { signal, reference } => {
                let (s, r) = both(signal, reference);
                let prev = snapshot.at(1);
                let (s_prev, r_prev) = (signal.evaluate(prev, ctx), reference.evaluate(prev, ctx));
                s < r && s_prev >= r_prev
            }
        }
    }
}

fn approx_equal(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() < EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::history::History;

    fn make_history(closes: &[f64]) -> History {
        History::from_columns(vec![("Close", closes.to_vec())]).unwrap()
    }

    fn value(v: f64) -> Method {
        Method::Value(v)
    }

    #[test]
    fn constants() {
        let history = make_history(&[1.0]);
        let snap = history.snapshot(0);
        let ctx = MethodContext::none();
        assert!(Filter::True.evaluate(snap, ctx));
        assert!(!Filter::False.evaluate(snap, ctx));
    }

    #[test]
    fn empty_composites() {
        let history = make_history(&[1.0]);
        let snap = history.snapshot(0);
        let ctx = MethodContext::none();
        assert!(Filter::AllOf(vec![]).evaluate(snap, ctx));
        assert!(!Filter::AnyOf(vec![]).evaluate(snap, ctx));
    }

    #[test]
    fn logical_combinators() {
        let history = make_history(&[1.0]);
        let snap = history.snapshot(0);
        let ctx = MethodContext::none();
        assert!(!Filter::and(Filter::True, Filter::False).evaluate(snap, ctx));
        assert!(Filter::or(Filter::True, Filter::False).evaluate(snap, ctx));
        assert!(Filter::xor(Filter::True, Filter::False).evaluate(snap, ctx));
        assert!(!Filter::xor(Filter::True, Filter::True).evaluate(snap, ctx));
        assert!(Filter::not(Filter::False).evaluate(snap, ctx));
        assert!(!Filter::AllOf(vec![Filter::True, Filter::False]).evaluate(snap, ctx));
        assert!(Filter::AnyOf(vec![Filter::False, Filter::True]).evaluate(snap, ctx));
    }

    #[test]
    fn comparisons() {
        let history = make_history(&[10.0]);
        let snap = history.snapshot(0);
        let ctx = MethodContext::none();
        assert!(Filter::greater_than(Method::Close, value(9.0)).evaluate(snap, ctx));
        assert!(!Filter::greater_than(Method::Close, value(10.0)).evaluate(snap, ctx));
        assert!(Filter::GreaterEqual { target: Method::Close, threshold: value(10.0) }.evaluate(snap, ctx));
        assert!(Filter::less_than(Method::Close, value(11.0)).evaluate(snap, ctx));
        assert!(Filter::LessEqual { target: Method::Close, threshold: value(10.0) }.evaluate(snap, ctx));
        assert!(Filter::Equal { target: Method::Close, threshold: value(10.0 + 1e-12) }.evaluate(snap, ctx));
        assert!(Filter::NotEqual { target: Method::Close, threshold: value(10.1) }.evaluate(snap, ctx));
    }

    #[test]
    fn nan_comparisons_are_false() {
        let history = make_history(&[10.0]);
        let snap = history.snapshot(0);
        let ctx = MethodContext::none();
        let nan = || Method::reference("missing");
        assert!(!Filter::greater_than(nan(), value(0.0)).evaluate(snap, ctx));
        assert!(!Filter::less_than(nan(), value(0.0)).evaluate(snap, ctx));
        assert!(!Filter::GreaterEqual { target: nan(), threshold: nan() }.evaluate(snap, ctx));
        assert!(!Filter::LessEqual { target: nan(), threshold: nan() }.evaluate(snap, ctx));
        assert!(!Filter::Equal { target: nan(), threshold: nan() }.evaluate(snap, ctx));
        assert!(!Filter::NotEqual { target: nan(), threshold: value(1.0) }.evaluate(snap, ctx));
    }

    #[test]
    fn crossover_and_crossunder() {
        let history = make_history(&[8.0, 12.0, 9.0]);
        let ctx = MethodContext::none();
        let over = Filter::crossover(Method::Close, value(10.0));
        let under = Filter::crossunder(Method::Close, value(10.0));

        // 8 -> 12 crosses above 10
        assert!(over.evaluate(history.snapshot(1), ctx));
        assert!(!under.evaluate(history.snapshot(1), ctx));
        // 12 -> 9 crosses below 10
        assert!(under.evaluate(history.snapshot(0), ctx));
        assert!(!over.evaluate(history.snapshot(0), ctx));
        // no previous bar
        assert!(!over.evaluate(history.snapshot(2), ctx));
        assert!(!under.evaluate(history.snapshot(2), ctx));
    }

    #[test]
    fn crossover_from_touching() {
        let history = make_history(&[10.0, 11.0]);
        let over = Filter::crossover(Method::Close, value(10.0));
        assert!(over.evaluate(history.snapshot(0), MethodContext::none()));
    }

    #[test]
    fn structural_equality() {
        let a = Filter::AllOf(vec![
            Filter::crossover(Method::ema(Method::Close, 12), Method::ema(Method::Close, 26)),
            Filter::greater_than(Method::rsi(Method::Close, 14), value(50.0)),
        ]);
        let b = Filter::AllOf(vec![
            Filter::crossover(Method::ema(Method::Close, 12), Method::ema(Method::Close, 26)),
            Filter::greater_than(Method::rsi(Method::Close, 14), value(50.0)),
        ]);
        assert_eq!(a, b);
        let c = Filter::AllOf(vec![
            Filter::crossover(Method::ema(Method::Close, 12), Method::ema(Method::Close, 26)),
            Filter::greater_than(Method::rsi(Method::Close, 14), value(55.0)),
        ]);
        assert_ne!(a, c);
    }

    #[test]
    fn kind_names() {
        assert_eq!(Filter::True.kind_name(), "TRUE");
        assert_eq!(Filter::not(Filter::True).kind_name(), "NOT");
    }
}
