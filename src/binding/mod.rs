//! Widget bindings (verb module)
//!
//! One binding per displayed widget. A binding reads the filter store,
//! re-derives its aggregate queries when the snapshot changes, executes them
//! against the data source, and exposes a render-ready result. Failures stay
//! inside the binding: one widget going stale never blocks its siblings.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, warn};

use crate::builder::{BuildError, QueryBuilder};
use crate::error::ConfigError;
use crate::filter::{FilterState, FilterStore};
use crate::model::{ConditionDef, WidgetDef};
use crate::query::{AggregateFn, AggregateQuery, Predicate};
use crate::source::{BucketValue, DataSource, SourceError};

/// Render-ready value for one aggregate
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateValue {
    Scalar(f64),
    Series(Vec<BucketValue>),
}

impl AggregateValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            AggregateValue::Scalar(v) => Some(*v),
            AggregateValue::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&[BucketValue]> {
        match self {
            AggregateValue::Series(buckets) => Some(buckets),
            AggregateValue::Scalar(_) => None,
        }
    }
}

/// One named aggregate value within a widget result
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub name: String,
    pub value: AggregateValue,
}

/// The full set of values computed for a widget from one snapshot
///
/// Replaced wholesale on every filter change, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetResult {
    pub values: Vec<AggregateResult>,
}

impl WidgetResult {
    pub fn get(&self, name: &str) -> Option<&AggregateValue> {
        self.values.iter().find(|v| v.name == name).map(|v| &v.value)
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(AggregateValue::as_scalar)
    }
}

/// What the widget can currently show
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetOutcome {
    Fresh(WidgetResult),
    /// The last refresh failed; `last` keeps the previous result visible
    Stale {
        last: Option<WidgetResult>,
        error: String,
    },
}

impl WidgetOutcome {
    pub fn result(&self) -> Option<&WidgetResult> {
        match self {
            WidgetOutcome::Fresh(result) => Some(result),
            WidgetOutcome::Stale { last, .. } => last.as_ref(),
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, WidgetOutcome::Fresh(_))
    }
}

/// Errors that can occur while refreshing a widget
#[derive(Debug)]
pub enum RefreshError {
    Build(BuildError),
    Source(SourceError),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshError::Build(err) => write!(f, "{}", err),
            RefreshError::Source(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RefreshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RefreshError::Build(err) => Some(err),
            RefreshError::Source(err) => Some(err),
        }
    }
}

/// An aggregate with its configuration resolved to typed pieces
struct CompiledAggregate {
    name: String,
    function: AggregateFn,
    conditions: Vec<Predicate>,
    /// Raw interval string; validated by the builder at refresh time
    bucket: Option<String>,
}

#[derive(Default)]
struct Inner {
    /// Snapshot the cached outcome was computed from (memoization key)
    last_state: Option<Arc<FilterState>>,
    result: Option<WidgetOutcome>,
}

/// Binds one widget to the filter store and a data source
pub struct WidgetBinding {
    name: String,
    title: Option<String>,
    collection: String,
    store: Arc<FilterStore>,
    source: Arc<dyn DataSource>,
    builder: QueryBuilder,
    aggregates: Vec<CompiledAggregate>,
    inner: Mutex<Inner>,
}

impl WidgetBinding {
    pub fn new(
        def: &WidgetDef,
        store: Arc<FilterStore>,
        source: Arc<dyn DataSource>,
        builder: QueryBuilder,
    ) -> Result<Self, ConfigError> {
        let aggregates = def
            .aggregates
            .iter()
            .map(|a| {
                Ok(CompiledAggregate {
                    name: a.name.clone(),
                    function: a.aggregate_fn()?,
                    conditions: a.conditions.iter().map(ConditionDef::to_predicate).collect(),
                    bucket: a.bucket.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            name: def.name.clone(),
            title: def.title.clone(),
            collection: def.source.clone(),
            store,
            source,
            builder,
            aggregates,
            inner: Mutex::new(Inner::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display title; falls back to the widget name
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    /// React to a replaced filter snapshot
    ///
    /// Structurally equal snapshots reuse the cached result; at most one
    /// data-source read happens per aggregate per distinct snapshot.
    pub fn on_filter_changed(&self, state: &Arc<FilterState>, version: u64) {
        {
            let inner = self.inner.lock().unwrap();
            if inner.last_state.as_deref() == Some(state.as_ref()) {
                debug!(widget = %self.name, version, "snapshot unchanged; reusing cached result");
                return;
            }
        }
        self.refresh(state, version);
    }

    /// The latest outcome; computes lazily from the store's current snapshot
    /// if nothing has been computed yet (first render)
    pub fn current_result(&self) -> WidgetOutcome {
        {
            let inner = self.inner.lock().unwrap();
            if let Some(result) = &inner.result {
                return result.clone();
            }
        }
        let (state, version) = self.store.current_versioned();
        self.refresh(&state, version);
        self.inner
            .lock()
            .unwrap()
            .result
            .clone()
            .unwrap_or(WidgetOutcome::Stale {
                last: None,
                error: "superseded before first result".to_string(),
            })
    }

    /// Build and execute every aggregate for `state`
    ///
    /// The base query is built once; each aggregate branches from it, so all
    /// of them carry identical shared predicates. Each read is retried at
    /// most once. No state is mutated; pair with [`apply_result`] when
    /// dispatching computation off the notification pass.
    ///
    /// [`apply_result`]: WidgetBinding::apply_result
    pub fn compute_result(&self, state: &FilterState) -> Result<WidgetResult, RefreshError> {
        let base = self
            .builder
            .base(&self.collection, state)
            .map_err(RefreshError::Build)?;

        let mut values = Vec::with_capacity(self.aggregates.len());
        for aggregate in &self.aggregates {
            let query = self
                .builder
                .branch(&base, &aggregate.conditions)
                .with_aggregate(aggregate.function.clone());
            let value = match &aggregate.bucket {
                Some(interval) => {
                    let series = self
                        .builder
                        .bucketed(&query, interval)
                        .map_err(RefreshError::Build)?;
                    AggregateValue::Series(
                        self.read_with_retry(|| self.source.series_aggregate(&series))?,
                    )
                }
                None => AggregateValue::Scalar(self.read_with_retry(|| run_scalar(
                    self.source.as_ref(),
                    &query,
                ))?),
            };
            values.push(AggregateResult {
                name: aggregate.name.clone(),
                value,
            });
        }
        Ok(WidgetResult { values })
    }

    /// Store a computed result, unless a newer snapshot has been published
    /// since it was computed
    ///
    /// Returns whether the result was applied. Late results for superseded
    /// snapshots are dropped so an in-flight slow read can never overwrite a
    /// newer snapshot's result.
    pub fn apply_result(
        &self,
        state: &Arc<FilterState>,
        version: u64,
        result: WidgetResult,
    ) -> bool {
        if self.store.version() != version {
            debug!(
                widget = %self.name,
                version,
                current = self.store.version(),
                "discarding result computed for a superseded snapshot"
            );
            return false;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.last_state = Some(state.clone());
        inner.result = Some(WidgetOutcome::Fresh(result));
        true
    }

    fn refresh(&self, state: &Arc<FilterState>, version: u64) {
        match self.compute_result(state) {
            Ok(result) => {
                self.apply_result(state, version, result);
            }
            Err(err) => self.mark_stale(state, version, err),
        }
    }

    /// Record a failed refresh, keeping the previous result visible
    fn mark_stale(&self, state: &Arc<FilterState>, version: u64, err: RefreshError) {
        if let RefreshError::Build(BuildError::InvalidInterval(interval)) = &err {
            // A defect in widget configuration, not a user-facing condition
            debug_assert!(false, "widget '{}' requested invalid interval '{}'", self.name, interval);
            error!(widget = %self.name, interval = %interval, "invalid bucket interval; widget skipped");
        } else {
            error!(widget = %self.name, error = %err, "widget refresh failed");
        }
        if self.store.version() != version {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        let last = match inner.result.take() {
            Some(WidgetOutcome::Fresh(result)) => Some(result),
            Some(WidgetOutcome::Stale { last, .. }) => last,
            None => None,
        };
        // Failures memoize too: re-submitting the same snapshot does not
        // hammer a broken source
        inner.last_state = Some(state.clone());
        inner.result = Some(WidgetOutcome::Stale {
            last,
            error: err.to_string(),
        });
    }

    /// One retry, no backoff: these are interactive reads and must not hang
    /// the page
    fn read_with_retry<T>(
        &self,
        read: impl Fn() -> Result<T, SourceError>,
    ) -> Result<T, RefreshError> {
        match read() {
            Ok(value) => Ok(value),
            Err(first) => {
                warn!(widget = %self.name, error = %first, "data source read failed; retrying once");
                read().map_err(RefreshError::Source)
            }
        }
    }
}

fn run_scalar(source: &dyn DataSource, query: &AggregateQuery) -> Result<f64, SourceError> {
    match query.aggregate {
        AggregateFn::Count => source.count(query).map(|n| n as f64),
        _ => source.aggregate(query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterValue;
    use crate::model::DashboardConfig;
    use crate::query::{TimeSeriesQuery, Value};
    use crate::source::MemorySource;
    use crate::source::Row;
    use chrono::NaiveDateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WIDGETS_YAML: &str = r#"
widgets:
  - name: post_stats
    source: posts
    aggregates:
      - name: total
      - name: published
        where:
          - field: published
            value: true
  - name: posts_over_time
    source: posts
    aggregates:
      - name: created
        bucket: month
"#;

    /// Counts underlying reads so memoization is observable
    struct CountingSource {
        inner: MemorySource,
        reads: AtomicUsize,
    }

    impl CountingSource {
        fn new(inner: MemorySource) -> Self {
            Self {
                inner,
                reads: AtomicUsize::new(0),
            }
        }

        fn reads(&self) -> usize {
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

    /// Fails the first `failures` reads, then delegates
    struct FlakySource {
        inner: MemorySource,
        failures: AtomicUsize,
    }

    impl FlakySource {
        fn new(inner: MemorySource, failures: usize) -> Self {
            Self {
                inner,
                failures: AtomicUsize::new(failures),
            }
        }

        fn fail(&self) -> bool {
            loop {
                let left = self.failures.load(Ordering::SeqCst);
                if left == 0 {
                    return false;
                }
                if self
                    .failures
                    .compare_exchange(left, left - 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    return true;
                }
            }
        }
    }

    impl DataSource for FlakySource {
        fn count(&self, query: &AggregateQuery) -> Result<u64, SourceError> {
            if self.fail() {
                return Err(SourceError::Unavailable {
                    message: "connection reset".to_string(),
                });
            }
            self.inner.count(query)
        }

        fn aggregate(&self, query: &AggregateQuery) -> Result<f64, SourceError> {
            if self.fail() {
                return Err(SourceError::Unavailable {
                    message: "connection reset".to_string(),
                });
            }
            self.inner.aggregate(query)
        }

        fn series_aggregate(&self, query: &TimeSeriesQuery) -> Result<Vec<BucketValue>, SourceError> {
            if self.fail() {
                return Err(SourceError::Unavailable {
                    message: "connection reset".to_string(),
                });
            }
            self.inner.series_aggregate(query)
        }
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn blog() -> MemorySource {
        let post = |created: &str, published: bool| {
            Row::new()
                .set("created_at", Value::Timestamp(ts(created)))
                .set("published", Value::Bool(published))
        };
        MemorySource::new().with_rows(
            "posts",
            vec![
                post("2024-01-05 09:30:00", true),
                post("2024-01-20 18:00:00", false),
                post("2024-02-11 12:15:00", true),
            ],
        )
    }

    fn stat_widget_def() -> WidgetDef {
        DashboardConfig::from_str(WIDGETS_YAML)
            .unwrap()
            .get_widget("post_stats")
            .unwrap()
            .clone()
    }

    fn chart_widget_def() -> WidgetDef {
        DashboardConfig::from_str(WIDGETS_YAML)
            .unwrap()
            .get_widget("posts_over_time")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_current_result_computes_lazily() {
        let store = Arc::new(FilterStore::new());
        let binding = WidgetBinding::new(
            &stat_widget_def(),
            store,
            Arc::new(blog()),
            QueryBuilder::new(),
        )
        .unwrap();

        let outcome = binding.current_result();
        let result = outcome.result().unwrap();
        assert_eq!(result.scalar("total"), Some(3.0));
        assert_eq!(result.scalar("published"), Some(2.0));
    }

    #[test]
    fn test_memoizes_on_structural_equality() {
        let store = Arc::new(FilterStore::new());
        let source = Arc::new(CountingSource::new(blog()));
        let binding = WidgetBinding::new(
            &stat_widget_def(),
            store.clone(),
            source.clone(),
            QueryBuilder::new(),
        )
        .unwrap();

        let (state, version) = store.current_versioned();
        binding.on_filter_changed(&state, version);
        let after_first = source.reads();
        assert_eq!(after_first, 2); // one read per aggregate

        // Same snapshot again: no further reads
        binding.on_filter_changed(&state, version);
        let equal = Arc::new(FilterState::empty());
        binding.on_filter_changed(&equal, version);
        assert_eq!(source.reads(), after_first);
    }

    #[test]
    fn test_stale_result_is_dropped() {
        let store = Arc::new(FilterStore::new());
        let binding = WidgetBinding::new(
            &stat_widget_def(),
            store.clone(),
            Arc::new(blog()),
            QueryBuilder::new(),
        )
        .unwrap();

        // Simulate a slow read: compute for version 0, but publish version 1
        // before the result lands
        let (old_state, old_version) = store.current_versioned();
        let slow_result = binding.compute_result(&old_state).unwrap();

        let published_only =
            FilterState::empty().with_updated(FilterState::PUBLISHED_STATUS, FilterValue::Flag(true));
        let new_version = store.replace(published_only);
        let (new_state, _) = store.current_versioned();
        binding.on_filter_changed(&new_state, new_version);
        let fresh = binding.current_result();

        assert!(!binding.apply_result(&old_state, old_version, slow_result));
        assert_eq!(binding.current_result(), fresh);
    }

    #[test]
    fn test_retry_recovers_from_one_failure() {
        let store = Arc::new(FilterStore::new());
        let binding = WidgetBinding::new(
            &chart_widget_def(),
            store,
            Arc::new(FlakySource::new(blog(), 1)),
            QueryBuilder::new(),
        )
        .unwrap();

        let outcome = binding.current_result();
        assert!(outcome.is_fresh());
        let result = outcome.result().unwrap();
        let series = result.get("created").unwrap().as_series().unwrap();
        assert_eq!(series.len(), 2); // Jan and Feb buckets
    }

    #[test]
    fn test_persistent_failure_reports_stale_and_keeps_last() {
        let store = Arc::new(FilterStore::new());
        let source = Arc::new(FlakySource::new(blog(), 0));
        let binding = WidgetBinding::new(
            &stat_widget_def(),
            store.clone(),
            source.clone(),
            QueryBuilder::new(),
        )
        .unwrap();

        // First refresh succeeds
        let first = binding.current_result();
        assert!(first.is_fresh());

        // Source goes down for longer than the single retry
        source.failures.store(100, Ordering::SeqCst);
        let state = Arc::new(
            FilterState::empty().with_updated(FilterState::PUBLISHED_STATUS, FilterValue::Flag(true)),
        );
        let version = store.replace(state.as_ref().clone());
        binding.on_filter_changed(&state, version);

        match binding.current_result() {
            WidgetOutcome::Stale { last, error } => {
                assert_eq!(last.as_ref(), first.result());
                assert!(error.contains("unavailable") || error.contains("Unavailable"));
            }
            other => panic!("Expected Stale outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_compute_result_rejects_invalid_interval() {
        let yaml = r#"
widgets:
  - name: broken_chart
    source: posts
    aggregates:
      - name: created
        bucket: fortnight
"#;
        let config = DashboardConfig::from_str(yaml).unwrap();
        let store = Arc::new(FilterStore::new());
        let binding = WidgetBinding::new(
            config.get_widget("broken_chart").unwrap(),
            store,
            Arc::new(blog()),
            QueryBuilder::new(),
        )
        .unwrap();

        let err = binding.compute_result(&FilterState::empty()).unwrap_err();
        assert!(matches!(
            err,
            RefreshError::Build(BuildError::InvalidInterval(_))
        ));
    }
}
