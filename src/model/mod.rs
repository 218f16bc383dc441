//! Dashboard configuration model (noun module)
//!
//! Widgets are configured declaratively: each widget names a data source and
//! a list of aggregates; each aggregate may carry branch conditions and an
//! optional bucket interval (which turns it into a time series).

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::query::{AggregateFn, CompareOp, Predicate, Value};

/// The root dashboard configuration
#[derive(Debug, Deserialize)]
pub struct DashboardConfig {
    pub widgets: Vec<WidgetDef>,
}

impl DashboardConfig {
    /// Load a dashboard configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path_str,
            source: e,
        })?;
        Self::from_str(&contents)
    }

    /// Parse a dashboard configuration from a YAML string
    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(ConfigError::from)
    }

    pub fn get_widget(&self, name: &str) -> Option<&WidgetDef> {
        self.widgets.iter().find(|w| w.name == name)
    }
}

/// One dashboard widget: a unit of display backed by aggregates
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetDef {
    pub name: String,
    /// Display title; defaults to the name in the rendering layer
    pub title: Option<String>,
    /// Name of the underlying collection (model/table)
    pub source: String,
    #[serde(default)]
    pub aggregates: Vec<AggregateDef>,
}

/// One aggregate computation within a widget
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateDef {
    pub name: String,
    #[serde(default)]
    pub function: AggregationKind,
    /// Target field for sum/average; ignored for count
    pub field: Option<String>,
    /// Branch conditions appended to the shared filter predicates
    #[serde(default, rename = "where")]
    pub conditions: Vec<ConditionDef>,
    /// Bucket interval (hour/day/month/year); presence makes this a series.
    /// Kept as the raw string so an unsupported value surfaces through the
    /// builder's interval validation.
    pub bucket: Option<String>,
}

impl AggregateDef {
    /// Resolve the configured function and target field
    pub fn aggregate_fn(&self) -> Result<AggregateFn, ConfigError> {
        match self.function {
            AggregationKind::Count => Ok(AggregateFn::Count),
            AggregationKind::Sum => {
                let field = self.field.clone().ok_or_else(|| ConfigError::Invalid {
                    message: format!("aggregate '{}' uses sum but names no field", self.name),
                })?;
                Ok(AggregateFn::Sum(field))
            }
            AggregationKind::Average => {
                let field = self.field.clone().ok_or_else(|| ConfigError::Invalid {
                    message: format!("aggregate '{}' uses average but names no field", self.name),
                })?;
                Ok(AggregateFn::Average(field))
            }
        }
    }
}

/// Aggregate function names accepted in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    Count,
    Sum,
    Average,
}

impl Default for AggregationKind {
    fn default() -> Self {
        AggregationKind::Count
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationKind::Count => write!(f, "count"),
            AggregationKind::Sum => write!(f, "sum"),
            AggregationKind::Average => write!(f, "average"),
        }
    }
}

/// A configured branch condition
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionDef {
    pub field: String,
    /// Optional operator, defaults to "eq"
    #[serde(default)]
    pub operator: Option<String>,
    pub value: serde_json::Value,
}

impl ConditionDef {
    /// Convert to a typed predicate
    pub fn to_predicate(&self) -> Predicate {
        let op = match self.operator.as_deref() {
            Some("neq") | Some("!=") => CompareOp::NotEq,
            Some("lt") | Some("<") => CompareOp::Lt,
            Some("lte") | Some("<=") => CompareOp::LtEq,
            Some("gt") | Some(">") => CompareOp::Gt,
            Some("gte") | Some(">=") => CompareOp::GtEq,
            // Default to equality, including unknown operator names
            _ => CompareOp::Eq,
        };
        Predicate::new(&self.field, op, value_from_json(&self.value))
    }
}

/// Convert a JSON literal from the config into a typed value
fn value_from_json(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Null
            }
        }
        serde_json::Value::String(s) => {
            // Date-shaped strings become typed dates so they compare against
            // timestamp columns
            match s.parse::<chrono::NaiveDate>() {
                Ok(d) => Value::Date(d),
                Err(_) => Value::String(s.clone()),
            }
        }
        // Arrays and objects are not meaningful as scalar conditions
        _ => Value::Null,
    }
}
