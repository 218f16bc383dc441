//! Data-source access (the external collaborator boundary)
//!
//! Widget bindings hand declarative query descriptions to a [`DataSource`];
//! the crate itself never talks to a database. [`MemorySource`] is a small
//! execution engine over in-memory rows so the pipeline can be exercised end
//! to end in tests and demos.

mod memory;

pub use memory::{MemorySource, Row};

use std::fmt;

use crate::query::{AggregateQuery, TimeSeriesQuery};

/// One bucket of a time-series result
#[derive(Debug, Clone, PartialEq)]
pub struct BucketValue {
    pub label: String,
    pub value: f64,
}

impl BucketValue {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Executes aggregate query descriptions against some backing collection
pub trait DataSource: Send + Sync {
    /// Number of rows matching the query's predicates
    fn count(&self, query: &AggregateQuery) -> Result<u64, SourceError>;

    /// Scalar aggregate over the matching rows
    fn aggregate(&self, query: &AggregateQuery) -> Result<f64, SourceError>;

    /// Time-bucketed aggregate; buckets are returned in chronological order
    fn series_aggregate(&self, query: &TimeSeriesQuery) -> Result<Vec<BucketValue>, SourceError>;
}

/// Errors reported by a data source
#[derive(Debug, Clone)]
pub enum SourceError {
    /// The backing store could not be reached or the collection is unknown
    Unavailable { message: String },
    /// The query references fields the collection cannot aggregate
    BadQuery { message: String },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Unavailable { message } => {
                write!(f, "Data source unavailable: {}", message)
            }
            SourceError::BadQuery { message } => {
                write!(f, "Bad aggregate query: {}", message)
            }
        }
    }
}

impl std::error::Error for SourceError {}
