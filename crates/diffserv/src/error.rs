//! Error types for conditioner configuration.
//!
//! Packet processing itself never fails; every variant here is raised while
//! a conditioner is being built from its configuration.

use std::fmt;
use std::io;

use crate::util::parse::ParseError;

/// Result type for conditioner configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring a traffic conditioner.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error while reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An attribute of a configuration element holds an invalid value.
    #[error("{element}: invalid '{attribute}': {message}")]
    Config {
        /// Path of the offending element (e.g. `classifier.filters[2]`).
        element: String,
        /// Name of the offending attribute.
        attribute: String,
        /// Human-readable description.
        message: String,
    },

    /// A required attribute is absent.
    #[error("{element}: missing required attribute '{attribute}'")]
    MissingAttribute {
        /// Path of the offending element.
        element: String,
        /// Name of the missing attribute.
        attribute: String,
    },

    /// A classifier, meter or shaper type name is not known.
    #[error("unknown {category} type: {name}")]
    UnknownType {
        /// Component category ("classifier", "meter", "shaper").
        category: &'static str,
        /// The type name that was not recognized.
        name: String,
    },

    /// A traffic profile references a meter that was never defined.
    #[error("meter named '{name}' not found")]
    UnknownMeter {
        /// The meter name.
        name: String,
    },

    /// Two meters share the same name.
    #[error("meter named '{name}' already defined")]
    DuplicateMeter {
        /// The meter name.
        name: String,
    },

    /// Structured validation failure.
    #[error("validation failed: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationErrorInfo>),

    /// Value parse error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error annotated with the configuration element it was raised for.
    #[error("{element}: {source}")]
    InElement {
        /// Path of the element.
        element: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },
}

/// A single structured validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorInfo {
    /// Field that failed validation.
    pub field: String,
    /// Description of the error.
    pub message: String,
}

impl ValidationErrorInfo {
    /// Create a new validation error info.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationErrorInfo]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create an invalid-attribute error.
    pub fn config(
        element: impl Into<String>,
        attribute: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::Config {
            element: element.into(),
            attribute: attribute.into(),
            message: message.to_string(),
        }
    }

    /// Create a missing-attribute error.
    pub fn missing(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            element: element.into(),
            attribute: attribute.into(),
        }
    }

    /// Attach the configuration element this error was raised for.
    ///
    /// Errors that already name an element are returned unchanged.
    pub fn in_element(self, element: impl Into<String>) -> Self {
        match self {
            Self::Config { .. } | Self::MissingAttribute { .. } | Self::InElement { .. } => self,
            other => Self::InElement {
                element: element.into(),
                source: Box::new(other),
            },
        }
    }

    /// Get the configuration element path, if this error names one.
    pub fn element(&self) -> Option<&str> {
        match self {
            Self::Config { element, .. }
            | Self::MissingAttribute { element, .. }
            | Self::InElement { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Check if this error originates from configuration content (as
    /// opposed to reading or deserializing the file).
    pub fn is_config(&self) -> bool {
        match self {
            Self::Io(_) | Self::Yaml(_) | Self::Json(_) => false,
            Self::InElement { source, .. } => source.is_config(),
            _ => true,
        }
    }
}
