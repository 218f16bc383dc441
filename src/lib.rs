//! dashfilter - Compile dashboard filter state into composable aggregate queries
//!
//! This library provides:
//! - Typed filter snapshots shared across dashboard widgets (FilterState)
//! - A page-scoped store with ordered change notification (FilterStore)
//! - Aggregate query composition with shared/branch predicates (QueryBuilder)
//! - Widget bindings that re-derive results on every filter change
//! - A coordinator that parses raw form input at the boundary
//!
//! # Architecture
//!
//! **Noun modules** (data structures):
//! - `filter/` - filter snapshots and the store (FilterState, FilterValue, FilterStore)
//! - `query/` - query descriptions (AggregateQuery, TimeSeriesQuery, Predicate)
//! - `model/` - dashboard configuration (DashboardConfig, WidgetDef, AggregateDef)
//!
//! **Verb modules** (transformations):
//! - `parser/` - raw form values → FilterState
//! - `builder/` - FilterState → query descriptions (base/branch/bucketed)
//! - `binding/` - snapshot change → recomputed widget results
//! - `coordinator/` - form submission, widget registry, notification
//!
//! Execution lives behind the `source::DataSource` trait; the crate builds
//! declarative query descriptions and never performs I/O of its own.
//!
//! # Example
//!
//! ```ignore
//! use dashfilter::{Coordinator, DashboardConfig};
//!
//! let config = DashboardConfig::from_file("dashboard.yaml")?;
//! let mut coordinator = Coordinator::from_config(&config, source)?;
//! let stats = coordinator.widget("post_stats").unwrap();
//! coordinator.submit_filters(&form_values)?;
//! let outcome = stats.current_result();
//! ```

pub mod binding;
pub mod builder;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod model;
pub mod parser;
pub mod query;
pub mod source;

// Re-export commonly used types
pub use binding::{AggregateResult, AggregateValue, RefreshError, WidgetBinding, WidgetOutcome, WidgetResult};
pub use builder::{BuildError, QueryBuilder};
pub use coordinator::{Coordinator, SubmitError};
pub use error::ConfigError;
pub use filter::{FilterState, FilterStore, FilterValue, SubscriptionId};
pub use model::{AggregateDef, AggregationKind, ConditionDef, DashboardConfig, WidgetDef};
pub use parser::{parse_form_values, FormError};
pub use query::{AggregateFn, AggregateQuery, CompareOp, Predicate, TimeBucket, TimeSeriesQuery, Value};
pub use source::{BucketValue, DataSource, MemorySource, Row, SourceError};
