use std::fmt;

use chrono::NaiveDate;

/// Errors that can occur while building query descriptions
#[derive(Debug)]
pub enum BuildError {
    /// The filter range is inverted (start after end); surfaced to the user
    /// rather than silently producing an empty result
    InvalidRange { start: NaiveDate, end: NaiveDate },
    /// An unsupported bucket interval was requested; a defect in widget
    /// configuration, not a user-facing condition
    InvalidInterval(String),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::InvalidRange { start, end } => {
                write!(f, "Start date {} is after end date {}", start, end)
            }
            BuildError::InvalidInterval(interval) => {
                write!(
                    f,
                    "Invalid bucket interval '{}', expected one of hour, day, month, year",
                    interval
                )
            }
        }
    }
}

impl std::error::Error for BuildError {}
