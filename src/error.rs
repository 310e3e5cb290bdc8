//! Error types for attrdb
//!
//! Every failure the engine can report is surfaced to the caller. Nothing is
//! retried and nothing is silently recovered, with one exception: range
//! comparisons skip values that cannot be ordered against the bound.
//!
//! Error codes:
//! - ATTRDB_NOT_FOUND
//! - ATTRDB_UNKNOWN_ATTRIBUTE
//! - ATTRDB_AMBIGUOUS_MATCH
//! - ATTRDB_FORBIDDEN_ATTRIBUTE
//! - ATTRDB_STALE_QUERY
//! - ATTRDB_INVALID_QUERY
//! - ATTRDB_TYPE_MISMATCH
//! - ATTRDB_MISSING_DEFAULT

use std::fmt;

use thiserror::Error;

use crate::index::Generation;
use crate::storage::Position;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Fieldless classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Access to a removed or out-of-range position
    NotFound,
    /// Query or declaration references an attribute that is not tracked
    UnknownAttribute,
    /// Exactly one match was required
    AmbiguousMatch,
    /// Attribute excluded or not allowed by policy
    ForbiddenAttribute,
    /// Query built under a superseded generation
    StaleQuery,
    /// Malformed selector or query combination
    InvalidQuerySyntax,
    /// Value cannot take part in the requested comparison
    TypeMismatch,
    /// Declaration without a default while some record lacks the attribute
    MissingDefault,
}

impl ErrorKind {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "ATTRDB_NOT_FOUND",
            ErrorKind::UnknownAttribute => "ATTRDB_UNKNOWN_ATTRIBUTE",
            ErrorKind::AmbiguousMatch => "ATTRDB_AMBIGUOUS_MATCH",
            ErrorKind::ForbiddenAttribute => "ATTRDB_FORBIDDEN_ATTRIBUTE",
            ErrorKind::StaleQuery => "ATTRDB_STALE_QUERY",
            ErrorKind::InvalidQuerySyntax => "ATTRDB_INVALID_QUERY",
            ErrorKind::TypeMismatch => "ATTRDB_TYPE_MISMATCH",
            ErrorKind::MissingDefault => "ATTRDB_MISSING_DEFAULT",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the record store, its indexes and the query evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("no live record at position {position}")]
    NotFound { position: Position },

    #[error("unknown attribute: {attribute}")]
    UnknownAttribute { attribute: String },

    #[error("expected exactly one match, found {found}")]
    AmbiguousMatch { found: usize },

    #[error("attribute '{attribute}' is {reason}")]
    ForbiddenAttribute { attribute: String, reason: String },

    #[error("query built at generation {built} is stale (store is at generation {current})")]
    StaleQuery { built: Generation, current: Generation },

    #[error("invalid query: {0}")]
    InvalidQuerySyntax(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("attribute '{attribute}' has no default but record {position} lacks it")]
    MissingDefault { attribute: String, position: Position },
}

impl StoreError {
    pub(crate) fn unknown_attribute(attribute: impl Into<String>) -> Self {
        StoreError::UnknownAttribute {
            attribute: attribute.into(),
        }
    }

    pub(crate) fn forbidden(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::ForbiddenAttribute {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_query(reason: impl Into<String>) -> Self {
        StoreError::InvalidQuerySyntax(reason.into())
    }

    pub(crate) fn type_mismatch(reason: impl Into<String>) -> Self {
        StoreError::TypeMismatch(reason.into())
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::UnknownAttribute { .. } => ErrorKind::UnknownAttribute,
            StoreError::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
            StoreError::ForbiddenAttribute { .. } => ErrorKind::ForbiddenAttribute,
            StoreError::StaleQuery { .. } => ErrorKind::StaleQuery,
            StoreError::InvalidQuerySyntax(_) => ErrorKind::InvalidQuerySyntax,
            StoreError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            StoreError::MissingDefault { .. } => ErrorKind::MissingDefault,
        }
    }

    /// Returns the string code of the error kind
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

/// Errors raised while loading a [`StoreConfig`](crate::api::StoreConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
