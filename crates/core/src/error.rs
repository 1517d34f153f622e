//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Username failed validation (length or character set).
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// Post body failed validation (empty after trim, or too long).
    #[error("invalid post body: {0}")]
    InvalidBody(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A user attempted to follow themselves.
    #[error("a user cannot follow themselves")]
    SelfFollow,

    /// The post was already retracted.
    #[error("post already retracted")]
    AlreadyRetracted,

    /// The follow relationship is not active.
    #[error("follow relationship is not active")]
    NotActive,

    /// A create-style decision was invoked on a non-fresh stream.
    #[error("aggregate already created")]
    AlreadyCreated,

    /// Rehydration was given an empty stream, or a stream whose first event
    /// belongs to a different aggregate kind.
    #[error("empty or foreign event stream")]
    EmptyStream,
}

impl DomainError {
    pub fn invalid_username(msg: impl Into<String>) -> Self {
        Self::InvalidUsername(msg.into())
    }

    pub fn invalid_body(msg: impl Into<String>) -> Self {
        Self::InvalidBody(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
