//! CSV trade report adapter implementing ReportPort.
//!
//! One row per trade record, in the order the backtest emitted them.

use std::fs;
use std::path::Path;

use chrono::DateTime;
use serde::Serialize;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TatraderError;
use crate::domain::strategy::Strategy;
use crate::domain::trade_record::{TradeRecord, TradeStatus};
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct TradeRow<'a> {
    strategy: &'a str,
    status: TradeStatus,
    direction: &'static str,
    position_size: f64,
    entry_time: String,
    entry_price: f64,
    average_price: f64,
    exit_time: String,
    exit_price: f64,
    stop_loss_price: f64,
    take_profit_price: f64,
    fee: f64,
    investment: f64,
    pnl: f64,
    percent: f64,
    duration: i64,
}

impl<'a> TradeRow<'a> {
    fn new(strategy: &'a str, record: &TradeRecord) -> Self {
        Self {
            strategy,
            status: record.status,
            direction: if record.is_short() { "short" } else { "long" },
            position_size: record.position_size,
            entry_time: format_timestamp(record.entry_timestamp),
            entry_price: record.entry_price,
            average_price: record.average_price,
            exit_time: format_timestamp(record.exit_timestamp),
            exit_price: record.exit_price,
            stop_loss_price: record.stop_loss_price,
            take_profit_price: record.take_profit_price,
            fee: record.fee,
            investment: record.investment(),
            pnl: record.pnl(),
            percent: record.percent(),
            duration: record.duration(),
        }
    }
}

/// Epoch seconds as `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn render(result: &BacktestResult, strategy: &Strategy) -> Result<Vec<u8>, TatraderError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in &result.trade_records {
            writer
                .serialize(TradeRow::new(&strategy.name, record))
                .map_err(|e| TatraderError::Io(std::io::Error::other(e)))?;
        }
        writer
            .into_inner()
            .map_err(|e| TatraderError::Io(std::io::Error::other(e.to_string())))
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        strategy: &Strategy,
        output_path: &str,
    ) -> Result<(), TatraderError> {
        let content = Self::render(result, strategy)?;

        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        tracing::info!(
            path = output_path,
            trades = result.trade_records.len(),
            "trade report written"
        );
        Ok(())
    }
}
