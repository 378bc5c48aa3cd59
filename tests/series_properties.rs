//! Property tests for the series algebra and the expression engine.

use proptest::prelude::*;
use tatrader::domain::filter::Filter;
use tatrader::domain::history::History;
use tatrader::domain::method::Method;
use tatrader::domain::registry::MethodContext;
use tatrader::domain::series::OutputSelector;

fn closes(values: Vec<f64>) -> History {
    History::from_columns(vec![("Close", values)]).unwrap()
}

fn eval(method: &Method, history: &History, offset: usize) -> f64 {
    method.evaluate(history.snapshot(offset), MethodContext::none())
}

fn price_series() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..1_000.0, 2..60)
}

fn moving_averages(period: usize) -> Vec<Method> {
    vec![
        Method::sma(Method::Close, period),
        Method::ema(Method::Close, period),
        Method::Rma {
            source: Box::new(Method::Close),
            period,
        },
        Method::Wma {
            source: Box::new(Method::Close),
            period,
        },
    ]
}

proptest! {
    #[test]
    fn past_history_is_undefined(values in price_series(), extra in 0usize..5, period in 1usize..10) {
        let history = closes(values);
        let beyond = history.len() + extra;
        prop_assert!(eval(&Method::Close, &history, beyond).is_nan());
        for method in moving_averages(period) {
            prop_assert!(eval(&method, &history, beyond).is_nan());
        }
    }

    #[test]
    fn averages_of_constant_are_constant(c in 1.0f64..500.0, len in 1usize..50, period in 1usize..12) {
        let history = closes(vec![c; len]);
        for method in moving_averages(period) {
            for offset in 0..len {
                let value = eval(&method, &history, offset);
                if !value.is_nan() {
                    prop_assert!((value - c).abs() <= 1e-9 * c, "{} gave {}", method.kind_name(), value);
                }
            }
        }
    }

    #[test]
    fn change_of_constant_is_zero(c in -100.0f64..100.0, len in 1usize..40) {
        let history = closes(vec![c; len]);
        let change = Method::Change { source: Box::new(Method::Close) };
        for offset in 0..len - 1 {
            prop_assert_eq!(eval(&change, &history, offset), 0.0);
        }
        prop_assert!(eval(&change, &history, len - 1).is_nan());
    }

    #[test]
    fn rsi_is_bounded(values in price_series(), period in 2usize..15) {
        let history = closes(values);
        let rsi = Method::rsi(Method::Close, period);
        for offset in 0..history.len() {
            let value = eval(&rsi, &history, offset);
            if !value.is_nan() {
                prop_assert!((0.0..=100.0).contains(&value));
            }
        }
    }

    #[test]
    fn rsi_of_monotonic_series(start in 10.0f64..100.0, step in 0.1f64..5.0, len in 20usize..40) {
        let rising: Vec<f64> = (0..len).map(|i| start + step * i as f64).collect();
        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        let rsi = Method::rsi(Method::Close, 14);
        prop_assert!((eval(&rsi, &closes(rising), 0) - 100.0).abs() < 1e-9);
        prop_assert!(eval(&rsi, &closes(falling), 0).abs() < 1e-9);
    }

    #[test]
    fn macd_histogram_is_line_minus_signal(values in prop::collection::vec(1.0f64..1_000.0, 40..80)) {
        let history = closes(values);
        let macd = Method::Macd { source: Box::new(Method::Close), fast: 5, slow: 13, signal: 4 };
        for offset in 0..history.len() {
            let snapshot = history.snapshot(offset);
            let ctx = MethodContext::none();
            let line = macd.evaluate_output(snapshot, OutputSelector::MacdLine, ctx);
            let signal = macd.evaluate_output(snapshot, OutputSelector::SignalLine, ctx);
            let histogram = macd.evaluate_output(snapshot, OutputSelector::Histogram, ctx);
            if !line.is_nan() && !signal.is_nan() {
                prop_assert_eq!(histogram, line - signal);
            }
        }
    }

    #[test]
    fn crossings_are_exclusive(values in price_series(), fast in 1usize..5, slow in 5usize..12) {
        let history = closes(values);
        let a = Method::sma(Method::Close, fast);
        let b = Method::sma(Method::Close, slow);
        let over = Filter::crossover(a.clone(), b.clone());
        let under = Filter::crossunder(a.clone(), b.clone());
        for offset in 0..history.len() {
            let snapshot = history.snapshot(offset);
            let ctx = MethodContext::none();
            let up = over.evaluate(snapshot, ctx);
            prop_assert!(!(up && under.evaluate(snapshot, ctx)));
            if up {
                prop_assert!(a.evaluate(snapshot, ctx) > b.evaluate(snapshot, ctx));
            }
        }
    }

    #[test]
    fn all_of_is_not_any_of_negations(bits in prop::collection::vec(any::<bool>(), 0..6)) {
        let history = closes(vec![1.0]);
        let ctx = MethodContext::none();
        let filters: Vec<Filter> = bits.iter().map(|&b| if b { Filter::True } else { Filter::False }).collect();
        let negated: Vec<Filter> = filters.iter().cloned().map(Filter::not).collect();
        let all = Filter::AllOf(filters).evaluate(history.snapshot(0), ctx);
        let any_negated = Filter::AnyOf(negated).evaluate(history.snapshot(0), ctx);
        prop_assert_eq!(all, !any_negated);
    }

    #[test]
    fn equal_trees_evaluate_identically(values in price_series(), period in 1usize..10, k in 0.5f64..3.0) {
        let history = closes(values);
        let build = || Method::add(
            Method::sma(Method::Close, period),
            Method::multiply(Method::StdDev { source: Box::new(Method::Close), period }, Method::Value(k)),
        );
        let (first, second) = (build(), build());
        prop_assert_eq!(&first, &second);
        for offset in 0..history.len() {
            let x = eval(&first, &history, offset);
            let y = eval(&second, &history, offset);
            prop_assert_eq!(x.to_bits(), y.to_bits());
        }
    }
}

#[test]
fn empty_combinators() {
    let history = closes(vec![1.0]);
    let ctx = MethodContext::none();
    assert!(Filter::AllOf(vec![]).evaluate(history.snapshot(0), ctx));
    assert!(!Filter::AnyOf(vec![]).evaluate(history.snapshot(0), ctx));
}

#[test]
fn changing_a_parameter_breaks_equality() {
    assert_eq!(Method::sma(Method::Close, 5), Method::sma(Method::Close, 5));
    assert_ne!(Method::sma(Method::Close, 5), Method::sma(Method::Close, 6));
    assert_ne!(Method::sma(Method::Close, 5), Method::ema(Method::Close, 5));
    assert_ne!(
        Filter::crossover(Method::Close, Method::Open),
        Filter::crossunder(Method::Close, Method::Open)
    );
}
