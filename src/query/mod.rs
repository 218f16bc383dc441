//! Aggregate query descriptions (noun module)
//!
//! These types describe *what* to compute over a filtered collection; they
//! perform no I/O. Execution is delegated to a [`crate::source::DataSource`].

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

/// A typed literal value used in predicates and data rows
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Calendar date (no time component)
    Date(NaiveDate),
    /// Wall-clock timestamp
    Timestamp(NaiveDateTime),
}

/// Comparison operators for predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }
}

/// A single (field, operator, value) constraint
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }
}

/// Aggregate functions over a filtered collection
///
/// Sum and Average carry the field they aggregate; Count counts rows.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateFn {
    Count,
    Sum(String),
    Average(String),
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFn::Count => write!(f, "count"),
            AggregateFn::Sum(field) => write!(f, "sum({})", field),
            AggregateFn::Average(field) => write!(f, "avg({})", field),
        }
    }
}

/// Bucket sizes for time-series aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucket {
    Hour,
    Day,
    Month,
    Year,
}

impl TimeBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeBucket::Hour => "hour",
            TimeBucket::Day => "day",
            TimeBucket::Month => "month",
            TimeBucket::Year => "year",
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when parsing a bucket interval string
#[derive(Debug, Clone)]
pub struct ParseBucketError {
    pub input: String,
}

impl fmt::Display for ParseBucketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid bucket interval '{}', expected one of hour, day, month, year",
            self.input
        )
    }
}

impl std::error::Error for ParseBucketError {}

impl FromStr for TimeBucket {
    type Err = ParseBucketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hour" => Ok(TimeBucket::Hour),
            "day" => Ok(TimeBucket::Day),
            "month" => Ok(TimeBucket::Month),
            "year" => Ok(TimeBucket::Year),
            _ => Err(ParseBucketError {
                input: s.to_string(),
            }),
        }
    }
}

/// A declarative scalar aggregate query
///
/// `predicates` is ordered: shared predicates derived from the filter
/// snapshot come first, branch-specific predicates are appended after them.
/// Correctness never depends on the order; it is kept stable so derived
/// queries are auditable against their base.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    /// Name of the underlying countable/summable collection
    pub source: String,
    pub predicates: Vec<Predicate>,
    pub aggregate: AggregateFn,
}

impl AggregateQuery {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            predicates: Vec::new(),
            aggregate: AggregateFn::Count,
        }
    }

    pub fn with_aggregate(mut self, aggregate: AggregateFn) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }
}

/// A scalar query with a grouping interval attached
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesQuery {
    pub query: AggregateQuery,
    pub bucket: TimeBucket,
    /// Timestamp column the buckets are derived from
    pub bucket_field: String,
}
