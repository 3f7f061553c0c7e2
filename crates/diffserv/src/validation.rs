//! Configuration validation.
//!
//! This module provides the [`Validatable`] trait for checking filters and
//! meter parameters once they have been parsed, before a conditioner is
//! assembled from them. Validation catches inconsistent values (a prefix
//! longer than its address family allows, an inverted port range) that a
//! single attribute parser cannot see.
//!
//! # Example
//!
//! ```
//! use diffserv::classifier::Filter;
//! use diffserv::validation::Validatable;
//!
//! let filter = Filter::new(diffserv::Dscp::EF).src_port_range(2000, 1000);
//!
//! let result = filter.validate();
//! assert!(!result.is_valid());
//! for err in &result.errors {
//!     eprintln!("Error in {}: {}", err.field, err.message);
//! }
//! ```

use std::net::IpAddr;

use crate::error::{Error, ValidationErrorInfo};
use crate::types::dscp::DSCP_MAX;

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// The configuration cannot be used.
    Error,
    /// Usable, but probably not what was intended.
    Warning,
}

/// A single validation error or warning.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Description of the error.
    pub message: String,
    /// Severity of the issue.
    pub severity: ValidationSeverity,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }

    /// Create a new validation warning.
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }

    /// Check if this is an error (not a warning).
    pub fn is_error(&self) -> bool {
        self.severity == ValidationSeverity::Error
    }

    /// Check if this is a warning.
    pub fn is_warning(&self) -> bool {
        self.severity == ValidationSeverity::Warning
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            ValidationSeverity::Error => "error",
            ValidationSeverity::Warning => "warning",
        };
        write!(f, "{} in '{}': {}", prefix, self.field, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Validation errors that will cause failure.
    pub errors: Vec<ValidationError>,
    /// Validation warnings that may cause issues.
    pub warnings: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create an empty validation result (valid).
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the configuration is valid (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Add an error to the result.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::error(field, message));
    }

    /// Add a warning to the result.
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationError::warning(field, message));
    }

    /// Merge another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Log every warning under the given configuration element.
    pub fn log_warnings(&self, element: &str) {
        for warning in &self.warnings {
            tracing::warn!(element, field = %warning.field, "{}", warning.message);
        }
    }

    /// Convert to a Result, failing if there are any errors.
    pub fn into_result(self) -> Result<(), Error> {
        if self.is_valid() {
            Ok(())
        } else {
            let errors: Vec<ValidationErrorInfo> = self
                .errors
                .into_iter()
                .map(|e| ValidationErrorInfo::new(e.field, e.message))
                .collect();
            Err(Error::Validation(errors))
        }
    }

    /// Get all issues (errors first, then warnings).
    pub fn all_issues(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

/// Trait for types that can be validated before use.
///
/// # Example
///
/// ```rust,ignore
/// impl Validatable for MyParams {
///     fn validate(&self) -> ValidationResult {
///         let mut result = ValidationResult::new();
///
///         if self.rate < 0.0 {
///             result.add_error("rate", "rate cannot be negative");
///         }
///
///         result
///     }
/// }
/// ```
pub trait Validatable {
    /// Validate this configuration.
    fn validate(&self) -> ValidationResult;

    /// Check if this configuration is valid (no errors).
    fn is_valid(&self) -> bool {
        self.validate().is_valid()
    }
}

/// Validate a code point value.
pub fn validate_dscp(dscp: u8, field: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if usize::from(dscp) >= DSCP_MAX {
        result.add_error(field, format!("DSCP must be 0-63, got {}", dscp));
    }

    result
}

/// Validate a prefix length against the family of its address.
pub fn validate_prefix_len(addr: &IpAddr, prefix_len: u8, field: &str) -> ValidationResult {
    match addr {
        IpAddr::V4(_) => validate_ipv4_prefix_len(prefix_len, field),
        IpAddr::V6(_) => validate_ipv6_prefix_len(prefix_len, field),
    }
}

/// Validate an IPv4 prefix length.
pub fn validate_ipv4_prefix_len(prefix_len: u8, field: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if prefix_len > 32 {
        result.add_error(
            field,
            format!("IPv4 prefix length must be 0-32, got {}", prefix_len),
        );
    }

    result
}

/// Validate an IPv6 prefix length.
pub fn validate_ipv6_prefix_len(prefix_len: u8, field: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if prefix_len > 128 {
        result.add_error(
            field,
            format!("IPv6 prefix length must be 0-128, got {}", prefix_len),
        );
    }

    result
}

/// Validate a port range.
pub fn validate_port_range(min: u16, max: u16, field: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if min > max {
        result.add_error(field, format!("port range min ({}) > max ({})", min, max));
    }

    result
}

/// Validate a percentage value (0-100).
pub fn validate_percentage(value: f64, field: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if !(0.0..=100.0).contains(&value) {
        result.add_error(field, format!("percentage must be 0-100, got {}", value));
    }

    result
}
