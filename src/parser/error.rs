use std::fmt;

/// Errors that can occur while parsing raw filter form values
///
/// These are user-recoverable: the coordinator reports them to the UI layer
/// as field-level messages and keeps the previous snapshot active.
#[derive(Debug)]
pub enum FormError {
    InvalidDate { field: String, value: String },
    InvalidStatus { value: String },
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::InvalidDate { field, value } => {
                write!(f, "Field '{}' has invalid date '{}', expected YYYY-MM-DD", field, value)
            }
            FormError::InvalidStatus { value } => {
                write!(f, "Invalid status value '{}', expected 1, 0, or empty", value)
            }
        }
    }
}

impl std::error::Error for FormError {}
