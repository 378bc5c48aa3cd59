#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tatrader::domain::filter::Filter;
use tatrader::domain::history::History;
use tatrader::domain::method::Method;
use tatrader::domain::strategy::{DirectionRules, Strategy};

pub const DAY: i64 = 86_400;

/// Daily bars starting at epoch day 1, one row per `(open, high, low, close)`.
pub fn ohlc_history(bars: &[(f64, f64, f64, f64)]) -> History {
    let column = |f: fn(&(f64, f64, f64, f64)) -> f64| bars.iter().map(f).collect::<Vec<_>>();
    History::from_columns(vec![
        (
            "Datetime",
            (1..=bars.len() as i64).map(|d| (d * DAY) as f64).collect(),
        ),
        ("Open", column(|b| b.0)),
        ("High", column(|b| b.1)),
        ("Low", column(|b| b.2)),
        ("Close", column(|b| b.3)),
        ("Volume", vec![1_000.0; bars.len()]),
    ])
    .unwrap()
}

/// Flat bars whose open/high/low equal the close.
pub fn close_history(closes: &[f64]) -> History {
    let bars: Vec<_> = closes.iter().map(|&c| (c, c, c, c)).collect();
    ohlc_history(&bars)
}

/// Long when close exceeds `level`, exit when it falls below `exit_level`.
pub fn threshold_strategy(level: f64, exit_level: f64, risk: f64) -> Strategy {
    let mut strategy = Strategy::new("threshold", Method::Value(risk));
    strategy.long = Some(DirectionRules {
        entry: Filter::greater_than(Method::Close, Method::Value(level)),
        exit: Filter::less_than(Method::Close, Method::Value(exit_level)),
    });
    strategy
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub const PRICES_CSV: &str = "\
Date,Open,High,Low,Close,Volume
2024-01-01,10,10.5,9.5,10,1000
2024-01-02,10,11.5,9.8,11,1200
2024-01-03,11,12.5,10.8,12,1100
2024-01-04,12,13.5,11.8,13,1300
2024-01-05,13,13.2,11.0,11.5,1500
2024-01-08,11.5,11.8,9.0,9.5,1700
2024-01-09,9.5,10.2,9.1,10,900
2024-01-10,10,11.0,9.9,10.8,1000
";

pub const MOMENTUM_JSON: &str = r#"{
    "name": "momentum",
    "series": {
        "fast": {"method": "SMA", "period": 2},
        "slow": {"method": "SMA", "period": 3}
    },
    "risk": {"VALUE": 1.0},
    "longPosition": {
        "entry": {"filter": "GREATER_THAN",
                  "target": {"method": "REFERENCE", "name": "fast"},
                  "threshold": {"method": "REFERENCE", "name": "slow"}},
        "exit": {"filter": "LESS_THAN",
                 "target": {"method": "REFERENCE", "name": "fast"},
                 "threshold": {"method": "REFERENCE", "name": "slow"}}
    }
}"#;

pub const BACKTEST_INI: &str = "\
[profile]
name = test
initial_capital = 10000
capital_risk = 0.01

[market]
name = TEST
min_order_qty = 1

[broker]
name = flat
fees = commission

[fee.commission]
type = fixed
position = long_and_short
trigger = all
value = 1.5

[backtest]
data = prices.csv
strategy = momentum.json
";
