//! Filter form parser (verb module)
//!
//! Transforms raw form values (loosely-typed strings) into a typed
//! [`FilterState`]. Parsing happens here, at the coordinator boundary, so
//! query-building logic never sees raw strings.

mod error;

pub use error::FormError;

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::filter::{FilterState, FilterValue};

/// Date format accepted from filter forms
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse raw form values into a typed filter snapshot
///
/// Rules:
/// - Empty strings mean "unset": the name is left absent from the snapshot.
/// - `start_date` / `end_date` must be `YYYY-MM-DD` dates.
/// - `published_status` is tri-state: "1"/"true" → true, "0"/"false" → false,
///   empty/absent → no constraint. Anything else is a validation error.
/// - Unrecognized names pass through as text, available to custom widget
///   logic but ignored by the default query builder.
///
/// A failed parse leaves no partial state behind; the caller keeps its
/// previous snapshot.
pub fn parse_form_values(raw: &BTreeMap<String, String>) -> Result<FilterState, FormError> {
    let mut state = FilterState::empty();

    for (name, value) in raw {
        if value.is_empty() {
            continue;
        }
        let parsed = match name.as_str() {
            FilterState::START_DATE | FilterState::END_DATE => {
                FilterValue::Date(parse_date(name, value)?)
            }
            FilterState::PUBLISHED_STATUS => FilterValue::Flag(parse_tri_state(value)?),
            _ => FilterValue::Text(value.clone()),
        };
        state = state.with_updated(name.clone(), parsed);
    }

    Ok(state)
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, FormError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| FormError::InvalidDate {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn parse_tri_state(value: &str) -> Result<bool, FormError> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(FormError::InvalidStatus {
            value: other.to_string(),
        }),
    }
}
