//! CSV price history adapter.
//!
//! The first column holds the timestamp; every other column is numeric and
//! keeps its header as the column name. Blank cells load as NaN.

use crate::domain::error::TatraderError;
use crate::domain::history::{FieldResolver, History};
use crate::ports::data_port::HistoryPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load_error(&self, reason: impl std::fmt::Display) -> TatraderError {
        TatraderError::DataLoad {
            reason: format!("{}: {}", self.path.display(), reason),
        }
    }
}

/// Parse a timestamp cell into epoch seconds (UTC).
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// RFC 3339 and integer epoch seconds.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return Some(seconds);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp())
}

impl HistoryPort for CsvAdapter {
    fn load_history(&self, resolver: &FieldResolver) -> Result<History, TatraderError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| self.load_error(format!("failed to read: {e}")))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| self.load_error(format!("CSV parse error: {e}")))?
            .clone();
        if headers.is_empty() {
            return Err(self.load_error("missing header row"));
        }

        let width = headers.len();
        let mut rows: Vec<(i64, Vec<f64>)> = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.load_error(format!("CSV parse error: {e}")))?;
            let row = line + 2;

            let stamp = record.get(0).unwrap_or_default();
            let timestamp = parse_timestamp(stamp)
                .ok_or_else(|| self.load_error(format!("row {row}: invalid timestamp {stamp:?}")))?;

            let mut values = Vec::with_capacity(width - 1);
            for (col, header) in headers.iter().enumerate().skip(1) {
                let cell = record.get(col).unwrap_or_default().trim();
                let value = if cell.is_empty() {
                    f64::NAN
                } else {
                    cell.parse::<f64>().map_err(|_| {
                        self.load_error(format!("row {row}: invalid {header} value {cell:?}"))
                    })?
                };
                values.push(value);
            }
            rows.push((timestamp, values));
        }

        if rows.is_empty() {
            return Err(TatraderError::NoData {
                asset: self.path.display().to_string(),
            });
        }

        rows.sort_by_key(|(timestamp, _)| *timestamp);

        let mut columns: Vec<(String, Vec<f64>)> = Vec::with_capacity(width);
        columns.push((
            resolver.datetime.clone(),
            rows.iter().map(|(t, _)| *t as f64).collect(),
        ));
        for (col, header) in headers.iter().enumerate().skip(1) {
            columns.push((
                header.trim().to_string(),
                rows.iter().map(|(_, values)| values[col - 1]).collect(),
            ));
        }

        let history = History::from_columns(columns)?.with_resolver(resolver.clone());
        tracing::debug!(
            path = %self.path.display(),
            bars = history.len(),
            "history loaded"
        );
        Ok(history)
    }
}
