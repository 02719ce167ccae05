//! The validation error taxonomy.
//!
//! Every recoverable validation failure is a [`ValidationError`] tagged with an
//! [`ErrorKind`]. The kind decides the HTTP status and the fallback message;
//! the key selects the translated message from the catalog.

use std::fmt::{self, Display};
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::Value;

use super::violation::Violations;

/// Boxed error type used at the crate's dynamic seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The closed set of validation failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Referenced resource absent.
    NotFound,
    /// State conflict.
    Conflict,
    /// Identifier inconsistency between path and body.
    IdMismatch,
    /// Caller-defined domain violation.
    Custom,
    /// Payload fails its structural schema.
    Schema,
}

impl ErrorKind {
    /// All kinds, in dispatch order.
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Conflict,
        ErrorKind::Custom,
        ErrorKind::IdMismatch,
        ErrorKind::NotFound,
        ErrorKind::Schema,
    ];

    /// Key used when an error is created without one.
    pub fn default_key(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "notFound",
            ErrorKind::Conflict => "conflict",
            ErrorKind::IdMismatch => "idMismatch",
            ErrorKind::Custom => "custom",
            ErrorKind::Schema => "schema",
        }
    }

    /// HTTP status rendered for this kind.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::IdMismatch | ErrorKind::Custom | ErrorKind::Schema => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Message rendered when the catalog has no entry for the error key.
    pub fn untranslated(self) -> &'static str {
        match self {
            ErrorKind::IdMismatch => "Untranslated ID mismatch error",
            ErrorKind::Custom => "Untranslated custom error",
            ErrorKind::NotFound | ErrorKind::Conflict | ErrorKind::Schema => "Untranslated",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::IdMismatch => "id mismatch",
            ErrorKind::Custom => "custom",
            ErrorKind::Schema => "schema",
        })
    }
}

/// What an error carries besides its key.
///
/// Structured detail and a wrapped lower-level failure are mutually exclusive.
#[derive(Debug, Clone)]
pub enum Cause {
    /// Structured validation detail.
    Detail(Value),
    /// Ordered schema violations.
    Violations(Violations),
    /// A lower-level failure that prevented validation from completing.
    Fault(Arc<dyn std::error::Error + Send + Sync>),
}

/// A typed, keyed validation failure.
///
/// # Example
///
/// ```rust
/// use reqguard::{ErrorKind, ValidationError};
///
/// let err = ValidationError::conflict().with_key("users.post.emailTaken");
/// assert_eq!(err.kind(), ErrorKind::Conflict);
/// assert_eq!(err.key(), "users.post.emailTaken");
///
/// let err = ValidationError::not_found();
/// assert_eq!(err.key(), "notFound");
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} validation error ({key})")]
pub struct ValidationError {
    kind: ErrorKind,
    key: String,
    cause: Option<Cause>,
}

impl ValidationError {
    /// Creates an error of the given kind; `None` selects the kind's default key.
    pub fn new(kind: ErrorKind, key: Option<String>) -> Self {
        Self {
            kind,
            key: key.unwrap_or_else(|| kind.default_key().to_string()),
            cause: None,
        }
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound, None)
    }

    pub fn conflict() -> Self {
        Self::new(ErrorKind::Conflict, None)
    }

    pub fn id_mismatch() -> Self {
        Self::new(ErrorKind::IdMismatch, None)
    }

    pub fn custom() -> Self {
        Self::new(ErrorKind::Custom, None)
    }

    /// Creates a schema error carrying the evaluator's violations.
    pub fn schema(violations: Violations) -> Self {
        Self {
            kind: ErrorKind::Schema,
            key: ErrorKind::Schema.default_key().to_string(),
            cause: Some(Cause::Violations(violations)),
        }
    }

    /// Replaces the message key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Attaches structured detail, replacing any previous cause.
    ///
    /// Schema violations are never replaced; on an error that carries them
    /// this is a no-op.
    pub fn with_detail(self, detail: Value) -> Self {
        self.replace_cause(Cause::Detail(detail))
    }

    /// Wraps a lower-level failure, replacing any previous cause.
    ///
    /// Like [`with_detail`](Self::with_detail), this leaves schema
    /// violations in place.
    pub fn with_source(self, source: impl Into<BoxError>) -> Self {
        self.replace_cause(Cause::Fault(Arc::from(source.into())))
    }

    fn replace_cause(mut self, cause: Cause) -> Self {
        if !matches!(self.cause, Some(Cause::Violations(_))) {
            self.cause = Some(cause);
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The key used for message lookup.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Structured detail, if that is what the error carries.
    pub fn detail(&self) -> Option<&Value> {
        match &self.cause {
            Some(Cause::Detail(detail)) => Some(detail),
            _ => None,
        }
    }

    /// Schema violations, if that is what the error carries.
    pub fn violations(&self) -> Option<&Violations> {
        match &self.cause {
            Some(Cause::Violations(violations)) => Some(violations),
            _ => None,
        }
    }

    /// The wrapped lower-level failure, if any.
    pub fn fault(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match &self.cause {
            Some(Cause::Fault(fault)) => Some(fault.as_ref()),
            _ => None,
        }
    }
}
