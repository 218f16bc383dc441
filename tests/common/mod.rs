//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;
use dashfilter::{
    AggregateQuery, BucketValue, DashboardConfig, DataSource, MemorySource, Row, SourceError,
    TimeSeriesQuery, Value,
};

/// Route log output through the test harness; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Load a dashboard config fixture from the tests/test_data directory
pub fn load_fixture(name: &str) -> DashboardConfig {
    let path = format!("tests/test_data/{}", name);
    DashboardConfig::from_file(&path)
        .unwrap_or_else(|e| panic!("Failed to load test data {}: {}", name, e))
}

pub fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|e| panic!("Bad timestamp {}: {}", s, e))
}

fn post(created: &str, published: bool, views: i64) -> Row {
    Row::new()
        .set("created_at", Value::Timestamp(ts(created)))
        .set("published", Value::Bool(published))
        .set("views", Value::Int(views))
}

/// A small blog dataset: 6 posts across three months, 4 published
pub fn blog_source() -> MemorySource {
    MemorySource::new().with_rows(
        "posts",
        vec![
            post("2024-01-05 09:30:00", true, 120),
            post("2024-01-12 11:00:00", false, 5),
            post("2024-01-28 16:45:00", true, 80),
            post("2024-02-03 10:00:00", true, 40),
            post("2024-02-14 09:00:00", false, 3),
            post("2024-03-09 20:30:00", true, 60),
        ],
    )
}

/// Raw form values as the UI layer would submit them
pub fn raw(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Wraps a source and counts underlying reads, so memoization and
/// read-per-aggregate guarantees are observable from tests
pub struct CountingSource {
    inner: MemorySource,
    reads: AtomicUsize,
}

impl CountingSource {
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl DataSource for CountingSource {
    fn count(&self, query: &AggregateQuery) -> Result<u64, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.count(query)
    }

    fn aggregate(&self, query: &AggregateQuery) -> Result<f64, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.aggregate(query)
    }

    fn series_aggregate(&self, query: &TimeSeriesQuery) -> Result<Vec<BucketValue>, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.series_aggregate(query)
    }
}

pub fn shared(source: MemorySource) -> Arc<MemorySource> {
    Arc::new(source)
}
