//! CLI definition and dispatch.

use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::{CsvReportAdapter, format_timestamp};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_strategy_adapter::JsonStrategyAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{broker_fee_ids, validate_backtest_config};
use crate::domain::error::TatraderError;
use crate::domain::execution::{
    Broker, BrokerFee, FeePosition, FeeTrigger, FeeType, Market, Profile,
};
use crate::domain::history::{Field, FieldResolver, History};
use crate::domain::method::Method;
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::HistoryPort;
use crate::ports::report_port::ReportPort;
use crate::ports::strategy_port::StrategyPort;

#[derive(Parser, Debug)]
#[command(name = "tatrader", about = "Technical-analysis strategy backtester")]
pub struct Cli {
    /// Log more (-v info, -vv debug); RUST_LOG applies when not given
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Trade report CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a strategy description
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Show the bars and columns of a price history
    Info {
        #[arg(short, long)]
        data: PathBuf,
        /// Config with a [history] section for column renames
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the recent values of a named strategy series
    Series {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(short, long)]
        name: String,
        #[arg(long, default_value_t = 10)]
        last: usize,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Install the global tracing subscriber, writing to stderr.
pub fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            strategy,
            data,
            output,
            json,
        } => run_backtest(&config, strategy, data, output, json),
        Command::Validate { strategy } => run_validate(&strategy),
        Command::Info { data, config } => run_info(&data, config.as_ref()),
        Command::Series {
            data,
            strategy,
            name,
            last,
            config,
        } => run_series(&data, &strategy, &name, last, config.as_ref()),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TatraderError> {
    FileConfigAdapter::from_file(path)
}

/// Paths in a config file are relative to the file's directory.
pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        return path;
    }
    match config_path.parent() {
        Some(dir) => dir.join(path),
        None => path,
    }
}

fn config_file(
    cli_value: Option<PathBuf>,
    config: &dyn ConfigPort,
    config_path: &Path,
    key: &str,
) -> Option<PathBuf> {
    cli_value.or_else(|| {
        config
            .get_string("backtest", key)
            .map(|value| resolve_path(config_path, &value))
    })
}

pub fn build_profile(config: &dyn ConfigPort) -> Profile {
    let defaults = Profile::default();
    Profile {
        name: config.get_string("profile", "name").unwrap_or(defaults.name),
        initial_capital: config.get_double("profile", "initial_capital", defaults.initial_capital),
        capital_risk: config.get_double("profile", "capital_risk", defaults.capital_risk),
    }
}

pub fn build_market(config: &dyn ConfigPort) -> Market {
    let min_order_qty = config.get_double("market", "min_order_qty", 0.0);
    Market {
        name: config.get_string("market", "name").unwrap_or_default(),
        min_order_qty,
        qty_step: config.get_double("market", "qty_step", min_order_qty),
    }
}

pub fn build_broker(config: &dyn ConfigPort) -> Result<Broker, TatraderError> {
    let mut fees = Vec::new();
    for id in broker_fee_ids(config) {
        let section = format!("fee.{id}");
        let field = |key: &str| {
            config
                .get_string(&section, key)
                .ok_or_else(|| TatraderError::ConfigMissing {
                    section: section.clone(),
                    key: key.into(),
                })
        };
        let unknown = |key: &str, value: &str| TatraderError::ConfigInvalid {
            section: section.clone(),
            key: key.into(),
            reason: format!("unknown value {value:?}"),
        };

        let fee_type = field("type")?;
        let position = field("position")?;
        let trigger = field("trigger")?;
        fees.push(BrokerFee {
            name: config.get_string(&section, "name").unwrap_or_else(|| id.clone()),
            fee_type: FeeType::from_name(&fee_type).ok_or_else(|| unknown("type", &fee_type))?,
            position: FeePosition::from_name(&position)
                .ok_or_else(|| unknown("position", &position))?,
            trigger: FeeTrigger::from_name(&trigger)
                .ok_or_else(|| unknown("trigger", &trigger))?,
            value: config.get_double(&section, "value", 0.0),
        });
    }
    Ok(Broker {
        name: config.get_string("broker", "name").unwrap_or_default(),
        fees,
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TatraderError> {
    Ok(BacktestConfig {
        profile: build_profile(config),
        market: build_market(config),
        broker: build_broker(config)?,
    })
}

/// Column renames from the `[history]` section.
pub fn build_field_resolver(config: &dyn ConfigPort) -> FieldResolver {
    let mut resolver = FieldResolver::default();
    for field in Field::ALL {
        let key = field.to_string().to_lowercase();
        if let Some(name) = config.get_string("history", &key) {
            resolver.set_column_name(field, name);
        }
    }
    resolver
}

fn optional_resolver(config_path: Option<&PathBuf>) -> Result<FieldResolver, TatraderError> {
    match config_path {
        Some(path) => Ok(build_field_resolver(&load_config(path)?)),
        None => Ok(FieldResolver::default()),
    }
}

pub fn load_strategy(path: &Path) -> Result<Strategy, TatraderError> {
    let strategy = JsonStrategyAdapter::from_file(path)?.load_strategy()?;
    strategy.validate()?;
    Ok(strategy)
}

fn run_backtest(
    config_path: &Path,
    strategy_path: Option<PathBuf>,
    data_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    json: bool,
) -> Result<(), TatraderError> {
    tracing::info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;

    let strategy_path = config_file(strategy_path, &config, config_path, "strategy").ok_or_else(
        || TatraderError::ConfigMissing {
            section: "backtest".into(),
            key: "strategy".into(),
        },
    )?;
    let data_path = config_file(data_path, &config, config_path, "data").ok_or_else(|| {
        TatraderError::ConfigMissing {
            section: "backtest".into(),
            key: "data".into(),
        }
    })?;
    let output_path = config_file(output_path, &config, config_path, "output");

    let strategy = load_strategy(&strategy_path)?;
    let history = CsvAdapter::new(data_path).load_history(&build_field_resolver(&config))?;
    let bt_config = build_backtest_config(&config)?;

    let report = output_path.map(|path| (CsvReportAdapter::new(), path));
    let result = run_backtest_pipeline(
        &history,
        &strategy,
        &bt_config,
        report
            .as_ref()
            .map(|(adapter, path)| (adapter as &dyn ReportPort, path.as_path())),
    )?;

    if json {
        println!("{}", summary_json(&strategy, &history, &result));
    } else {
        print_summary(&strategy, &history, &result);
    }
    Ok(())
}

/// Run the backtest and, when given, write the trade report.
pub fn run_backtest_pipeline(
    history: &History,
    strategy: &Strategy,
    bt_config: &BacktestConfig,
    report: Option<(&dyn ReportPort, &Path)>,
) -> Result<BacktestResult, TatraderError> {
    let result = backtest_engine::run_backtest(history, strategy, bt_config)?;
    if let Some((port, path)) = report {
        port.write(&result, strategy, &path.to_string_lossy())?;
    }
    Ok(result)
}

pub fn summary_json(
    strategy: &Strategy,
    history: &History,
    result: &BacktestResult,
) -> serde_json::Value {
    let s = &result.summary;
    json!({
        "strategy": strategy.name,
        "bars": history.len(),
        "initial_capital": s.initial_capital(),
        "capital": s.capital(),
        "equity": s.equity(),
        "peak_equity": s.peak_equity(),
        "max_drawdown": s.max_drawdown(),
        "max_drawdown_percent": s.max_drawdown_percent(),
        "trade_count": s.trade_count(),
        "profit_count": s.profit_count(),
        "loss_count": s.loss_count(),
        "break_even_count": s.break_even_count(),
        "open_trade_count": s.open_trade_count(),
        "cumulative_pnl": s.cumulative_pnl(),
        "cumulative_profits": s.cumulative_profits(),
        "cumulative_losses": s.cumulative_losses(),
        "profit_rate": s.profit_rate(),
        "average_profit": s.average_profit(),
        "average_loss": s.average_loss(),
        "expected_value": s.expected_value(),
        "expected_return": s.expected_return(),
        // infinite when there are no losses
        "profit_factor": finite_or_null(s.profit_factor()),
        "unrealized_pnl": s.unrealized_pnl(),
        "trades": result.trade_records,
    })
}

fn finite_or_null(value: f64) -> serde_json::Value {
    if value.is_finite() {
        json!(value)
    } else {
        serde_json::Value::Null
    }
}

fn print_summary(strategy: &Strategy, history: &History, result: &BacktestResult) {
    let s = &result.summary;
    println!("=== {} ===", strategy.name);
    println!("Bars:             {}", history.len());
    println!(
        "Trades:           {} ({} profit, {} loss, {} break-even)",
        s.trade_count(),
        s.profit_count(),
        s.loss_count(),
        s.break_even_count()
    );
    println!("Open trades:      {}", s.open_trade_count());
    println!("Net PnL:          {:.2}", s.cumulative_pnl());
    println!("Unrealized PnL:   {:.2}", s.unrealized_pnl());
    println!("Final equity:     {:.2}", s.equity());
    println!(
        "Max drawdown:     {:.2} ({:.1}%)",
        s.max_drawdown(),
        s.max_drawdown_percent()
    );
    println!("Profit rate:      {:.1}%", s.profit_rate() * 100.0);
    println!("Profit factor:    {:.2}", s.profit_factor());
    println!("Expected value:   {:.2}", s.expected_value());
}

fn run_validate(strategy_path: &Path) -> Result<(), TatraderError> {
    let strategy = load_strategy(strategy_path)?;
    let directions: Vec<&str> = [
        ("long", strategy.long.is_some()),
        ("short", strategy.short.is_some()),
    ]
    .into_iter()
    .filter_map(|(label, present)| present.then_some(label))
    .collect();
    println!(
        "Strategy {:?} is valid: {} series, {} rules",
        strategy.name,
        strategy.registry.len(),
        directions.join("/")
    );
    Ok(())
}

/// Oldest and newest timestamps, or `None` for an empty history.
pub fn history_span(history: &History) -> Option<(i64, i64)> {
    let oldest = history.len().checked_sub(1)?;
    Some((
        history.snapshot(oldest).timestamp(),
        history.snapshot(0).timestamp(),
    ))
}

fn run_info(data_path: &Path, config_path: Option<&PathBuf>) -> Result<(), TatraderError> {
    let resolver = optional_resolver(config_path)?;
    let history = CsvAdapter::new(data_path.to_path_buf()).load_history(&resolver)?;
    let (first, last) = history_span(&history).ok_or_else(|| TatraderError::NoData {
        asset: data_path.display().to_string(),
    })?;
    println!("{}", data_path.display());
    println!(
        "  {} bars, {} to {}",
        history.len(),
        format_timestamp(first),
        format_timestamp(last)
    );
    println!(
        "  columns: {}",
        history.column_names().collect::<Vec<_>>().join(", ")
    );
    Ok(())
}

fn run_series(
    data_path: &Path,
    strategy_path: &Path,
    name: &str,
    last: usize,
    config_path: Option<&PathBuf>,
) -> Result<(), TatraderError> {
    let strategy = JsonStrategyAdapter::from_file(strategy_path)?.load_strategy()?;
    if !strategy.registry.contains(name) {
        return Err(TatraderError::StrategyInvalid {
            reason: format!("no series named {name:?}"),
        });
    }
    let resolver = optional_resolver(config_path)?;
    let history = CsvAdapter::new(data_path.to_path_buf()).load_history(&resolver)?;

    let method = Method::reference(name);
    let ctx = strategy.context();
    for offset in (0..last.min(history.len())).rev() {
        let snapshot = history.snapshot(offset);
        println!(
            "{},{}",
            format_timestamp(snapshot.timestamp()),
            method.evaluate(snapshot, ctx)
        );
    }
    Ok(())
}
