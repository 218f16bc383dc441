use std::fmt;

use crate::builder::BuildError;
use crate::parser::FormError;

/// Errors reported back to the UI layer by `submit_filters`
///
/// In every case the previous snapshot stays active.
#[derive(Debug)]
pub enum SubmitError {
    /// A form field failed to parse
    Validation(FormError),
    /// The parsed date range is inverted
    Range(BuildError),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Validation(err) => write!(f, "{}", err),
            SubmitError::Range(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmitError::Validation(err) => Some(err),
            SubmitError::Range(err) => Some(err),
        }
    }
}
