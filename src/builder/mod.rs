//! Aggregate query construction from filter snapshots (verb module)
//!
//! Turns a [`FilterState`] into declarative query descriptions. The builder
//! performs no I/O; execution is delegated to a [`crate::source::DataSource`],
//! which keeps query composition independently testable.

mod error;

pub use error::BuildError;

use crate::filter::FilterState;
use crate::query::{AggregateQuery, CompareOp, Predicate, TimeSeriesQuery, Value};

/// Default timestamp column constrained by the shared date range
const DEFAULT_TIMESTAMP_FIELD: &str = "created_at";
/// Default boolean column constrained by the publication filter
const DEFAULT_STATUS_FIELD: &str = "published";

/// Builds aggregate queries whose shared predicates come from the filter
/// snapshot
///
/// All queries derived from one `base()` call carry identical shared
/// predicates; `branch()` only ever appends.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    timestamp_field: String,
    status_field: String,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
            status_field: DEFAULT_STATUS_FIELD.to_string(),
        }
    }

    /// Use a different timestamp column for the date-range predicates
    pub fn with_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self
    }

    /// Use a different boolean column for the publication predicate
    pub fn with_status_field(mut self, field: impl Into<String>) -> Self {
        self.status_field = field.into();
        self
    }

    pub fn timestamp_field(&self) -> &str {
        &self.timestamp_field
    }

    /// Build the shared-predicate query for `source` from the recognized
    /// filters
    ///
    /// Recognized names: `start_date` (inclusive lower bound), `end_date`
    /// (inclusive upper bound), `published_status` (tri-state). Unrecognized
    /// filter names are ignored so new filters can ship before every widget
    /// understands them.
    pub fn base(&self, source: &str, state: &FilterState) -> Result<AggregateQuery, BuildError> {
        self.check_range(state)?;

        let mut query = AggregateQuery::new(source);
        if let Some(start) = state.start_date() {
            query = query.with_predicate(Predicate::new(
                &self.timestamp_field,
                CompareOp::GtEq,
                Value::Date(start),
            ));
        }
        if let Some(end) = state.end_date() {
            query = query.with_predicate(Predicate::new(
                &self.timestamp_field,
                CompareOp::LtEq,
                Value::Date(end),
            ));
        }
        if let Some(published) = state.published_status() {
            query = query.with_predicate(Predicate::new(
                &self.status_field,
                CompareOp::Eq,
                Value::Bool(published),
            ));
        }
        Ok(query)
    }

    /// Derive a variant with `extra` predicates appended after the shared
    /// ones; the input query is not modified
    pub fn branch(&self, query: &AggregateQuery, extra: &[Predicate]) -> AggregateQuery {
        let mut branched = query.clone();
        branched.predicates.extend_from_slice(extra);
        branched
    }

    /// Attach a grouping interval, producing a time-series query
    ///
    /// Valid intervals: hour, day, month, year. Anything else is a defect in
    /// widget configuration, reported as [`BuildError::InvalidInterval`].
    pub fn bucketed(
        &self,
        query: &AggregateQuery,
        interval: &str,
    ) -> Result<TimeSeriesQuery, BuildError> {
        let bucket = interval
            .parse()
            .map_err(|_| BuildError::InvalidInterval(interval.to_string()))?;
        Ok(TimeSeriesQuery {
            query: query.clone(),
            bucket,
            bucket_field: self.timestamp_field.clone(),
        })
    }

    /// Reject snapshots whose date range is inverted
    ///
    /// Surfaced to the user instead of silently producing an empty result.
    pub fn check_range(&self, state: &FilterState) -> Result<(), BuildError> {
        if let (Some(start), Some(end)) = (state.start_date(), state.end_date()) {
            if start > end {
                return Err(BuildError::InvalidRange { start, end });
            }
        }
        Ok(())
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
