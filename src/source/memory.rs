//! In-memory data source
//!
//! A small predicate evaluator and aggregator over typed rows. It backs the
//! integration tests and demos; production deployments implement
//! [`DataSource`](super::DataSource) over their own store.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::query::{AggregateFn, AggregateQuery, CompareOp, Predicate, TimeBucket, TimeSeriesQuery, Value};

use super::{BucketValue, DataSource, SourceError};

/// One row of a collection: field name → typed value
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }
}

/// Collections of rows keyed by source name
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: HashMap<String, Vec<Row>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to a collection, creating the collection if needed
    pub fn insert(&mut self, source: &str, row: Row) {
        self.tables.entry(source.to_string()).or_default().push(row);
    }

    pub fn with_rows(mut self, source: &str, rows: Vec<Row>) -> Self {
        self.tables.entry(source.to_string()).or_default().extend(rows);
        self
    }

    fn rows(&self, source: &str) -> Result<&[Row], SourceError> {
        self.tables
            .get(source)
            .map(Vec::as_slice)
            .ok_or_else(|| SourceError::Unavailable {
                message: format!("unknown source '{}'", source),
            })
    }

    fn matching<'a>(&'a self, query: &'a AggregateQuery) -> Result<Vec<&'a Row>, SourceError> {
        let rows = self.rows(&query.source)?;
        Ok(rows
            .iter()
            .filter(|row| query.predicates.iter().all(|p| matches(row, p)))
            .collect())
    }
}

impl DataSource for MemorySource {
    fn count(&self, query: &AggregateQuery) -> Result<u64, SourceError> {
        Ok(self.matching(query)?.len() as u64)
    }

    fn aggregate(&self, query: &AggregateQuery) -> Result<f64, SourceError> {
        Ok(fold_rows(&self.matching(query)?, &query.aggregate))
    }

    fn series_aggregate(&self, query: &TimeSeriesQuery) -> Result<Vec<BucketValue>, SourceError> {
        let rows = self.matching(&query.query)?;

        // Bucket keys sort chronologically, so the BTreeMap iteration order
        // is the output order
        let mut buckets: BTreeMap<NaiveDateTime, Vec<&Row>> = BTreeMap::new();
        for row in rows {
            let Some(value) = row.get(&query.bucket_field) else {
                continue;
            };
            let Some(key) = truncate(value, query.bucket) else {
                continue;
            };
            buckets.entry(key).or_default().push(row);
        }

        Ok(buckets
            .into_iter()
            .map(|(key, rows)| BucketValue::new(label(key, query.bucket), fold_rows(&rows, &query.query.aggregate)))
            .collect())
    }
}

/// Evaluate one predicate against one row
///
/// Missing fields and incomparable types never match.
fn matches(row: &Row, predicate: &Predicate) -> bool {
    let Some(actual) = row.get(&predicate.field) else {
        return false;
    };
    let Some(ordering) = compare(actual, &predicate.value) else {
        return false;
    };
    match predicate.op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::GtEq => ordering != Ordering::Less,
    }
}

/// Compare a row value against a predicate value with the coercions the
/// filter vocabulary needs
///
/// Date bounds compare against timestamp columns by calendar date, so an
/// inclusive `end_date` covers the whole day.
fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Date(b)) => Some(a.date().cmp(b)),
        (Value::Date(a), Value::Timestamp(b)) => Some(a.cmp(&b.date())),
        _ => None,
    }
}

/// Numeric view of a value for sum/average; non-numeric values are skipped
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Apply an aggregate function to a set of rows
fn fold_rows(rows: &[&Row], aggregate: &AggregateFn) -> f64 {
    match aggregate {
        AggregateFn::Count => rows.len() as f64,
        AggregateFn::Sum(field) => rows
            .iter()
            .filter_map(|row| row.get(field).and_then(numeric))
            .sum(),
        AggregateFn::Average(field) => {
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|row| row.get(field).and_then(numeric))
                .collect();
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        }
    }
}

/// Truncate a date/timestamp value to its bucket start
fn truncate(value: &Value, bucket: TimeBucket) -> Option<NaiveDateTime> {
    let ts = match value {
        Value::Timestamp(ts) => *ts,
        Value::Date(d) => d.and_hms_opt(0, 0, 0)?,
        _ => return None,
    };
    match bucket {
        TimeBucket::Hour => ts.date().and_hms_opt(ts.hour(), 0, 0),
        TimeBucket::Day => ts.date().and_hms_opt(0, 0, 0),
        TimeBucket::Month => ts.date().with_day(1)?.and_hms_opt(0, 0, 0),
        TimeBucket::Year => ts.date().with_day(1)?.with_month(1)?.and_hms_opt(0, 0, 0),
    }
}

/// Human-readable label for a bucket start
fn label(start: NaiveDateTime, bucket: TimeBucket) -> String {
    match bucket {
        TimeBucket::Hour => start.format("%Y-%m-%d %H:00").to_string(),
        TimeBucket::Day => start.format("%Y-%m-%d").to_string(),
        TimeBucket::Month => start.format("%Y-%m").to_string(),
        TimeBucket::Year => start.format("%Y").to_string(),
    }
}
