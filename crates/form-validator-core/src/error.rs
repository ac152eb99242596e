//! Core error types for the form-validator workspace.
//!
//! This module provides [`FieldError`] (a single failure descriptor),
//! [`ValidationError`] (the structured detail of a failed validation run),
//! and the [`FormError`] enum that every fallible operation returns.
//!
//! The split between [`FormError::Validation`] and the other variants is what
//! lets a caller tell "validation ran and the value is invalid" apart from
//! "validation could not run at all".

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single failure reported for a field.
///
/// `field` is the full path of the failing value. Top-level fields use their
/// plain name; nested members use a dotted path such as `address.city` or
/// `tags.1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// The (possibly dotted) path of the failing field.
    pub field: String,
    /// The display-ready error message.
    pub message: String,
    /// The value that failed validation.
    #[serde(default)]
    pub field_value: serde_json::Value,
}

impl FieldError {
    /// Creates a new `FieldError`.
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        field_value: serde_json::Value,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            field_value,
        }
    }

    /// Returns the top-level field this failure belongs to.
    ///
    /// ```
    /// use form_validator_core::FieldError;
    ///
    /// let err = FieldError::new("address.city", "city required", serde_json::Value::Null);
    /// assert_eq!(err.root_field(), "address");
    /// ```
    pub fn root_field(&self) -> &str {
        self.field
            .split_once('.')
            .map_or(self.field.as_str(), |(root, _)| root)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The structured detail of a failed validation run.
///
/// `errors` keeps every failure in the order it was reported; `fields`
/// groups the same failures by field path. Each field keeps an ordered list
/// so callers that want more than the first message can still see them.
///
/// # Examples
///
/// ```
/// use form_validator_core::{FieldError, ValidationError};
/// use serde_json::Value;
///
/// let err = ValidationError::new(vec![
///     FieldError::new("age", "age required", Value::Null),
///     FieldError::new("age", "age must be a number", Value::Null),
/// ]);
/// assert_eq!(err.first_message("age"), Some("age required"));
/// assert_eq!(err.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// All failures in reporting order.
    pub errors: Vec<FieldError>,
    /// Failures grouped by field path.
    pub fields: BTreeMap<String, Vec<FieldError>>,
}

impl ValidationError {
    /// Builds a `ValidationError` from a flat list of failures.
    pub fn new(errors: Vec<FieldError>) -> Self {
        let mut fields: BTreeMap<String, Vec<FieldError>> = BTreeMap::new();
        for error in &errors {
            fields
                .entry(error.field.clone())
                .or_default()
                .push(error.clone());
        }
        Self { errors, fields }
    }

    /// Returns the first message reported for `field`, if any.
    pub fn first_message(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|errors| errors.first())
            .map(|e| e.message.as_str())
    }

    /// Returns the first failure whose top-level field is `root`.
    ///
    /// This covers both a direct failure of `root` and failures of nested
    /// members such as `root.child`.
    pub fn first_for_root(&self, root: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.root_field() == root)
    }

    /// Returns `true` if a failure was reported for `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns the reported field paths in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns the total number of failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if no failure was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for the form-validator workspace.
#[derive(Error, Debug)]
pub enum FormError {
    // ── Validation outcome ───────────────────────────────────────────

    /// One or more fields failed their rules. The Error Store has already
    /// been updated by the time a caller sees this.
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    // ── Evaluation failures ──────────────────────────────────────────

    /// A custom rule could not produce a verdict.
    #[error("Rule evaluation failed for '{field}': {reason}")]
    RuleEvaluation {
        /// The field whose rule aborted.
        field: String,
        /// Why the rule could not run.
        reason: String,
    },

    /// A rule declared a pattern that is not a valid regular expression.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern source.
        pattern: String,
        /// The regex compiler's complaint.
        reason: String,
    },

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// A rule set or model could not be (de)serialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FormError {
    /// Returns `true` if validation ran and rejected at least one field.
    pub const fn is_validation_failure(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns the structured failure detail for a validation failure.
    pub const fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for FormError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

/// A convenience type alias for `Result<T, FormError>`.
pub type FormResult<T> = Result<T, FormError>;
