//! Named-column price history and lookback snapshots.
//!
//! A [`History`] stores equal-length numeric columns ordered oldest first.
//! A [`Snapshot`] is a cheap `(history, offset)` view where offset 0 is the
//! newest sample. Reads past either end of the history yield NaN.

use std::collections::BTreeMap;

use super::error::HistoryError;

/// Canonical fields every history can expose through a [`FieldResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Datetime,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Datetime,
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
    ];
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Datetime => "Datetime",
            Field::Open => "Open",
            Field::High => "High",
            Field::Low => "Low",
            Field::Close => "Close",
            Field::Volume => "Volume",
        };
        write!(f, "{name}")
    }
}

/// Maps canonical fields to the column names a dataset actually uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldResolver {
    pub datetime: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

impl Default for FieldResolver {
    fn default() -> Self {
        FieldResolver {
            datetime: "Datetime".into(),
            open: "Open".into(),
            high: "High".into(),
            low: "Low".into(),
            close: "Close".into(),
            volume: "Volume".into(),
        }
    }
}

impl FieldResolver {
    pub fn column_name(&self, field: Field) -> &str {
        match field {
            Field::Datetime => &self.datetime,
            Field::Open => &self.open,
            Field::High => &self.high,
            Field::Low => &self.low,
            Field::Close => &self.close,
            Field::Volume => &self.volume,
        }
    }

    pub fn set_column_name(&mut self, field: Field, name: impl Into<String>) {
        let name = name.into();
        match field {
            Field::Datetime => self.datetime = name,
            Field::Open => self.open = name,
            Field::High => self.high = name,
            Field::Low => self.low = name,
            Field::Close => self.close = name,
            Field::Volume => self.volume = name,
        }
    }
}

/// Immutable collection of equal-length named columns, oldest sample first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    columns: BTreeMap<String, Vec<f64>>,
    len: usize,
    resolver: FieldResolver,
}

impl History {
    /// Build a history from `(name, values)` pairs ordered oldest first.
    ///
    /// Every column must have the same length and a distinct name.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, HistoryError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        let mut len: Option<usize> = None;

        for (name, values) in columns {
            let name = name.into();
            match len {
                None => len = Some(values.len()),
                Some(expected) if expected != values.len() => {
                    return Err(HistoryError::ColumnLengthMismatch {
                        column: name,
                        expected,
                        actual: values.len(),
                    });
                }
                Some(_) => {}
            }
            if map.contains_key(&name) {
                return Err(HistoryError::DuplicateColumn { column: name });
            }
            map.insert(name, values);
        }

        Ok(History {
            columns: map,
            len: len.unwrap_or(0),
            resolver: FieldResolver::default(),
        })
    }

    pub fn with_resolver(mut self, resolver: FieldResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn resolver(&self) -> &FieldResolver {
        &self.resolver
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Look a column up by exact name, falling back to a case-insensitive match.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        if let Some(values) = self.columns.get(name) {
            return Some(values);
        }
        self.columns
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    pub fn field_column(&self, field: Field) -> Option<&[f64]> {
        self.column(self.resolver.column_name(field))
    }

    /// Snapshot at `offset` samples back from the newest sample.
    pub fn snapshot(&self, offset: usize) -> Snapshot<'_> {
        Snapshot {
            history: self,
            offset,
        }
    }

    /// Snapshot positioned on the bar with chronological `index` (0 = oldest).
    pub fn snapshot_at_index(&self, index: usize) -> Snapshot<'_> {
        let offset = if index < self.len {
            self.len - 1 - index
        } else {
            self.len
        };
        self.snapshot(offset)
    }
}

/// Read-only view of a [`History`] at a lookback offset.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    history: &'a History,
    offset: usize,
}

impl<'a> Snapshot<'a> {
    pub fn new(history: &'a History, offset: usize) -> Self {
        Snapshot { history, offset }
    }

    pub fn history(&self) -> &'a History {
        self.history
    }

    /// Lookback offset of this snapshot (0 = newest sample).
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// A snapshot `k` samples further into the past.
    pub fn at(&self, k: usize) -> Snapshot<'a> {
        Snapshot {
            history: self.history,
            offset: self.offset.saturating_add(k),
        }
    }

    /// Remaining samples from this offset back to the oldest sample.
    pub fn len(&self) -> usize {
        self.history.len().saturating_sub(self.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Chronological bar index (0 = oldest), or `None` past the oldest sample.
    pub fn index(&self) -> Option<usize> {
        (self.offset < self.history.len()).then(|| self.history.len() - 1 - self.offset)
    }

    /// Value of a named column at this offset; NaN when missing or out of range.
    pub fn get(&self, name: &str) -> f64 {
        match (self.history.column(name), self.index()) {
            (Some(values), Some(index)) => values[index],
            _ => f64::NAN,
        }
    }

    pub fn field(&self, field: Field) -> f64 {
        match (self.history.field_column(field), self.index()) {
            (Some(values), Some(index)) => values[index],
            _ => f64::NAN,
        }
    }

    pub fn datetime(&self) -> f64 {
        self.field(Field::Datetime)
    }

    pub fn open(&self) -> f64 {
        self.field(Field::Open)
    }

    pub fn high(&self) -> f64 {
        self.field(Field::High)
    }

    pub fn low(&self) -> f64 {
        self.field(Field::Low)
    }

    pub fn close(&self) -> f64 {
        self.field(Field::Close)
    }

    pub fn volume(&self) -> f64 {
        self.field(Field::Volume)
    }

    /// Datetime as whole epoch seconds; 0 when the column is absent.
    pub fn timestamp(&self) -> i64 {
        let datetime = self.datetime();
        if datetime.is_finite() { datetime as i64 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_history() -> History {
        History::from_columns(vec![
            ("Datetime", vec![1.0, 2.0, 3.0, 4.0]),
            ("Open", vec![9.0, 10.0, 11.0, 12.0]),
            ("Close", vec![10.0, 11.0, 12.0, 13.0]),
        ])
        .unwrap()
    }

    #[test]
    fn snapshot_zero_is_newest() {
        let history = sample_history();
        let snapshot = history.snapshot(0);
        assert!((snapshot.close() - 13.0).abs() < f64::EPSILON);
        assert!((snapshot.at(3).close() - 10.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.index(), Some(3));
    }

    #[test]
    fn out_of_range_is_nan() {
        let history = sample_history();
        let past = history.snapshot(4);
        assert!(past.is_empty());
        assert!(past.close().is_nan());
        assert_eq!(past.index(), None);
        assert!(history.snapshot(100).at(usize::MAX).close().is_nan());
    }

    #[test]
    fn missing_column_is_nan() {
        let history = sample_history();
        let snapshot = history.snapshot(0);
        assert!(snapshot.high().is_nan());
        assert!(snapshot.get("Sentiment").is_nan());
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = History::from_columns(vec![
            ("Close", vec![1.0, 2.0]),
            ("Open", vec![1.0]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            HistoryError::ColumnLengthMismatch {
                column: "Open".into(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn duplicate_column_rejected() {
        let err = History::from_columns(vec![("Close", vec![1.0]), ("Close", vec![2.0])])
            .unwrap_err();
        assert!(matches!(err, HistoryError::DuplicateColumn { .. }));
    }

    #[test]
    fn resolver_renames_close() {
        let history = History::from_columns(vec![("C", vec![5.0, 6.0])]).unwrap();
        assert!(history.snapshot(0).close().is_nan());

        let mut resolver = FieldResolver::default();
        resolver.set_column_name(Field::Close, "C");
        let history = history.with_resolver(resolver);
        assert!((history.snapshot(0).close() - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn column_lookup_is_case_insensitive_fallback() {
        let history = History::from_columns(vec![("close", vec![7.0])]).unwrap();
        assert!((history.snapshot(0).close() - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_at_index_maps_to_offset() {
        let history = sample_history();
        assert_eq!(history.snapshot_at_index(0).offset(), 3);
        assert_eq!(history.snapshot_at_index(3).offset(), 0);
        assert!(history.snapshot_at_index(9).is_empty());
    }

    #[test]
    fn timestamp_truncates_datetime() {
        let history = sample_history();
        assert_eq!(history.snapshot(1).timestamp(), 3);
        let no_dates = History::from_columns(vec![("Close", vec![1.0])]).unwrap();
        assert_eq!(no_dates.snapshot(0).timestamp(), 0);
    }

    #[test]
    fn empty_history() {
        let history = History::from_columns(Vec::<(String, Vec<f64>)>::new()).unwrap();
        assert!(history.is_empty());
        assert!(history.snapshot(0).close().is_nan());
    }
}
