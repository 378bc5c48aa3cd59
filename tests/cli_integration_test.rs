//! CLI integration tests: config builders and the subcommands run against
//! real files on disk.

mod common;

use clap::Parser;
use common::*;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tatrader::adapters::file_config_adapter::FileConfigAdapter;
use tatrader::cli::{self, Cli};
use tatrader::domain::error::TatraderError;
use tatrader::domain::execution::{FeePosition, FeeTrigger, FeeType};
use tatrader::domain::history::History;
use tempfile::TempDir;

fn exit_code(args: &[&str]) -> String {
    let cli = Cli::try_parse_from(args).unwrap();
    format!("{:?}", cli::run(cli))
}

fn code(n: u8) -> String {
    format!("{:?}", ExitCode::from(n))
}

fn success() -> String {
    format!("{:?}", ExitCode::SUCCESS)
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "prices.csv", PRICES_CSV);
    write_file(dir.path(), "momentum.json", MOMENTUM_JSON);
    write_file(dir.path(), "backtest.ini", BACKTEST_INI);
    dir
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

mod config_loading {
    use super::*;

    #[test]
    fn builds_profile_market_and_broker() {
        let adapter = FileConfigAdapter::from_string(BACKTEST_INI).unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();

        assert_eq!(config.profile.name, "test");
        assert!((config.profile.initial_capital - 10_000.0).abs() < f64::EPSILON);
        assert!((config.profile.capital_risk - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.market.name, "TEST");
        assert!((config.market.qty_step - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.broker.name, "flat");
        assert_eq!(config.broker.fees.len(), 1);
        let fee = &config.broker.fees[0];
        assert_eq!(fee.name, "commission");
        assert_eq!(fee.fee_type, FeeType::Fixed);
        assert_eq!(fee.position, FeePosition::LongAndShort);
        assert_eq!(fee.trigger, FeeTrigger::All);
        assert!((fee.value - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn defaults_without_sections() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ndata = x.csv\n").unwrap();
        let config = cli::build_backtest_config(&adapter).unwrap();
        assert_eq!(config.profile.name, "default");
        assert!((config.market.min_order_qty).abs() < f64::EPSILON);
        assert!(config.broker.fees.is_empty());
    }

    #[test]
    fn unknown_fee_type_is_invalid() {
        let adapter = FileConfigAdapter::from_string(
            "[broker]\nfees = x\n[fee.x]\ntype = tiered\nposition = long\ntrigger = entry\nvalue = 1\n",
        )
        .unwrap();
        let err = cli::build_broker(&adapter).unwrap_err();
        assert!(matches!(err, TatraderError::ConfigInvalid { ref key, .. } if key == "type"));
    }

    #[test]
    fn field_resolver_from_history_section() {
        let adapter =
            FileConfigAdapter::from_string("[history]\nclose = Adj Close\ndatetime = Date\n")
                .unwrap();
        let resolver = cli::build_field_resolver(&adapter);
        assert_eq!(resolver.close, "Adj Close");
        assert_eq!(resolver.datetime, "Date");
        assert_eq!(resolver.open, "Open");
    }

    #[test]
    fn history_span_of_empty_history() {
        assert_eq!(cli::history_span(&History::default()), None);
        let history = close_history(&[1.0, 2.0, 3.0]);
        assert_eq!(cli::history_span(&history), Some((DAY, 3 * DAY)));
    }

    #[test]
    fn relative_paths_follow_config_dir() {
        let resolved = cli::resolve_path(Path::new("/srv/bt/config.ini"), "data/prices.csv");
        assert_eq!(resolved, Path::new("/srv/bt/data/prices.csv"));
        let absolute = cli::resolve_path(Path::new("/srv/bt/config.ini"), "/tmp/p.csv");
        assert_eq!(absolute, Path::new("/tmp/p.csv"));
    }
}

mod commands {
    use super::*;

    #[test]
    fn backtest_from_config_paths() {
        let dir = workspace();
        let config = dir.path().join("backtest.ini");
        let output = dir.path().join("trades.csv");
        assert_eq!(
            exit_code(&["tatrader", "backtest", "-c", arg(&config), "-o", arg(&output)]),
            success()
        );
        let report = fs::read_to_string(&output).unwrap();
        assert_eq!(report.lines().count(), 3);
    }

    #[test]
    fn backtest_json_summary() {
        let dir = workspace();
        let config = dir.path().join("backtest.ini");
        assert_eq!(
            exit_code(&["tatrader", "backtest", "--config", arg(&config), "--json"]),
            success()
        );
    }

    #[test]
    fn backtest_missing_config_file() {
        assert_eq!(
            exit_code(&["tatrader", "backtest", "-c", "/nonexistent/backtest.ini"]),
            code(2)
        );
    }

    #[test]
    fn backtest_invalid_profile() {
        let dir = workspace();
        let config = write_file(
            dir.path(),
            "bad.ini",
            "[profile]\ninitial_capital = -5\ncapital_risk = 0.01\n",
        );
        assert_eq!(exit_code(&["tatrader", "backtest", "-c", arg(&config)]), code(2));
    }

    #[test]
    fn backtest_missing_data_file() {
        let dir = workspace();
        let config = dir.path().join("backtest.ini");
        let missing = dir.path().join("nope.csv");
        assert_eq!(
            exit_code(&["tatrader", "backtest", "-c", arg(&config), "-d", arg(&missing)]),
            code(3)
        );
    }

    #[test]
    fn validate_accepts_strategy() {
        let dir = workspace();
        let strategy = dir.path().join("momentum.json");
        assert_eq!(
            exit_code(&["tatrader", "validate", "-s", arg(&strategy)]),
            success()
        );
    }

    #[test]
    fn validate_rejects_unknown_reference() {
        let dir = workspace();
        let strategy = write_file(
            dir.path(),
            "broken.json",
            r#"{"risk": 1, "longPosition": {"entry": {"filter": "GREATER_THAN",
                "target": {"method": "REFERENCE", "name": "missing"}, "threshold": 0}}}"#,
        );
        assert_eq!(exit_code(&["tatrader", "validate", "-s", arg(&strategy)]), code(4));
    }

    #[test]
    fn validate_rejects_malformed_json() {
        let dir = workspace();
        let strategy = write_file(dir.path(), "bad.json", "{\"risk\": ");
        assert_eq!(exit_code(&["tatrader", "validate", "-s", arg(&strategy)]), code(4));
    }

    #[test]
    fn info_reports_history() {
        let dir = workspace();
        let data = dir.path().join("prices.csv");
        assert_eq!(exit_code(&["tatrader", "info", "-d", arg(&data)]), success());
    }

    #[test]
    fn info_empty_history() {
        let dir = workspace();
        let data = write_file(dir.path(), "empty.csv", "Date,Close\n");
        assert_eq!(exit_code(&["tatrader", "info", "-d", arg(&data)]), code(5));
    }

    #[test]
    fn series_prints_named_series() {
        let dir = workspace();
        let data = dir.path().join("prices.csv");
        let strategy = dir.path().join("momentum.json");
        assert_eq!(
            exit_code(&[
                "tatrader",
                "series",
                "-d",
                arg(&data),
                "-s",
                arg(&strategy),
                "-n",
                "fast",
                "--last",
                "3",
            ]),
            success()
        );
    }

    #[test]
    fn series_unknown_name() {
        let dir = workspace();
        let data = dir.path().join("prices.csv");
        let strategy = dir.path().join("momentum.json");
        assert_eq!(
            exit_code(&[
                "tatrader",
                "series",
                "-d",
                arg(&data),
                "-s",
                arg(&strategy),
                "-n",
                "nope",
            ]),
            code(4)
        );
    }

    #[test]
    fn verbosity_flag_parses() {
        let cli = Cli::try_parse_from(["tatrader", "-vv", "info", "-d", "x.csv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
