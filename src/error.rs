//! Error types for config resolution
//!
//! Every failure carries an [`ErrorKind`]. Only [`ErrorKind::Unsupported`] is
//! ever retried (by the first-supported combinator); all other kinds abort the
//! parse. Kinds are checked structurally through [`ConfigError::kind`], so a
//! wrapped "unsupported" is still recognized after context has been added.

use std::fmt;

use thiserror::Error;

/// Coarse classification of a [`ConfigError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input is not valid document or URL syntax
    Format,
    /// Recognized discriminator with a disallowed, missing or mistyped field
    Schema,
    /// The parser does not claim this input
    Unsupported,
    /// Recognized shape with a semantically invalid value
    Validation,
    /// The parse was aborted through its context token
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Format => write!(f, "format"),
            ErrorKind::Schema => write!(f, "schema"),
            ErrorKind::Unsupported => write!(f, "unsupported"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Main error type for config resolution
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config format: {0}")]
    Format(String),

    #[error("field '{field}': {reason}")]
    Schema { field: String, reason: String },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Validation(String),

    #[error("parse cancelled")]
    Cancelled,

    /// Adds a location (field name, option index) in front of an inner error
    #[error("{context}: {inner}")]
    Context {
        context: String,
        inner: Box<ConfigError>,
    },
}

/// Result type alias for config resolution
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::schema(field, "unknown field")
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::schema(field, "missing required field")
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wraps this error with a location segment, keeping its kind.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            inner: Box::new(self),
        }
    }

    /// Returns the kind of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Format(_) => ErrorKind::Format,
            Self::Schema { .. } => ErrorKind::Schema,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Context { inner, .. } => inner.kind(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        self.kind() == ErrorKind::Unsupported
    }

    /// Returns the innermost error, skipping context wrappers.
    pub fn root_cause(&self) -> &ConfigError {
        match self {
            Self::Context { inner, .. } => inner.root_cause(),
            other => other,
        }
    }
}

/// Extension for attaching a location to a failed [`Result`]
pub trait ResultExt<T> {
    fn at(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn at(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }
}
