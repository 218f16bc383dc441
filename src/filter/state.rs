//! Immutable filter snapshots

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::value::FilterValue;

/// Immutable snapshot of the currently selected filter values
///
/// Every update produces a new snapshot; subscribers observe a consistent
/// value for the whole render pass. Structural equality (`PartialEq`) is the
/// memoization key for widget bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    values: BTreeMap<String, FilterValue>,
}

impl FilterState {
    /// Lower bound of the shared date range (inclusive)
    pub const START_DATE: &'static str = "start_date";
    /// Upper bound of the shared date range (inclusive)
    pub const END_DATE: &'static str = "end_date";
    /// Tri-state publication filter: absent = no constraint
    pub const PUBLISHED_STATUS: &'static str = "published_status";

    /// An empty snapshot: every filter unset
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (String, FilterValue)>,
    {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Pure lookup; absent names return None, never an error
    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.values.get(name)
    }

    /// Returns a new snapshot with `name` set to `value`; the receiver is
    /// left unchanged
    pub fn with_updated(&self, name: impl Into<String>, value: FilterValue) -> Self {
        let mut values = self.values.clone();
        values.insert(name.into(), value);
        Self { values }
    }

    /// Returns a new snapshot with `name` unset
    pub fn with_cleared(&self, name: &str) -> Self {
        let mut values = self.values.clone();
        values.remove(name);
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.get(Self::START_DATE).and_then(FilterValue::as_date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.get(Self::END_DATE).and_then(FilterValue::as_date)
    }

    /// Tri-state: None = no constraint, Some(true/false) = constrain
    pub fn published_status(&self) -> Option<bool> {
        self.get(Self::PUBLISHED_STATUS).and_then(FilterValue::as_flag)
    }
}
