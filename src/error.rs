//! Error types for resolution, registration and validation

use std::fmt;

use thiserror::Error;

/// Result type for SDF operations
pub type Result<T> = std::result::Result<T, SdfError>;

/// SDF errors
#[derive(Error, Debug)]
pub enum SdfError {
    #[error("Could not find {reference}")]
    PointerToNowhere { reference: String },

    #[error("Malformed registry entry: {0}")]
    MalformedRegistryEntry(String),

    #[error("Reference cycle detected: {}", chain.join(" -> "))]
    CycleDetected { chain: Vec<String> },

    #[error("Reference depth limit of {limit} exceeded while resolving {reference}")]
    RecursionLimit { limit: usize, reference: String },

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SdfError {
    pub(crate) fn nowhere(reference: impl Into<String>) -> Self {
        Self::PointerToNowhere {
            reference: reference.into(),
        }
    }

    /// The validation failure carried by this error, if any
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

/// Whether validation failed for lack of a value or because of a bad one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// No value was supplied and no default applies
    Missing,
    /// A value was supplied but does not satisfy the data qualities
    Invalid,
}

/// A value rejected by a compiled validator
#[derive(Error, Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Location of the offending value, `$` being the validated input
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn missing(path: impl Into<String>) -> Self {
        Self {
            kind: ValidationErrorKind::Missing,
            path: path.into(),
            message: "value is required".to_string(),
        }
    }

    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ValidationErrorKind::Invalid,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.kind == ValidationErrorKind::Missing
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ValidationErrorKind::Missing => write!(f, "Missing value at {}", self.path),
            ValidationErrorKind::Invalid => {
                write!(f, "Invalid value at {}: {}", self.path, self.message)
            }
        }
    }
}
