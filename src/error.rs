//! Error types for dashfilter

use std::fmt;

/// Errors that can occur while loading a dashboard configuration
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading file
    Io {
        path: String,
        source: std::io::Error,
    },
    /// YAML deserialization error
    Yaml {
        source: serde_yaml::Error,
    },
    /// Structurally valid YAML describing an unusable widget
    Invalid {
        message: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read '{}': {}", path, source)
            }
            ConfigError::Yaml { source } => {
                write!(f, "Invalid YAML: {}", source)
            }
            ConfigError::Invalid { message } => {
                write!(f, "Invalid dashboard config: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Yaml { source } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml { source: err }
    }
}
