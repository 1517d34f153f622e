//! Boundary error surface.
//!
//! Every failure a caller can see is a typed variant here; handlers map
//! domain, log, and projection errors 1:1 and never surface opaque strings
//! for deterministic failures.

use thiserror::Error;

use murmur_core::{PostId, UserId};
use murmur_infra::{EventLogError, ProjectionError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    // Validation: surfaced directly, no retry.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    #[error("invalid post body: {0}")]
    InvalidBody(String),

    #[error("a user cannot follow themselves")]
    SelfFollow,

    // Not found.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("post {0} not found")]
    PostNotFound(PostId),

    #[error("follow relationship not found")]
    RelationshipNotFound,

    // Conflict: the caller may retry after refreshing.
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("already following")]
    AlreadyFollowing,

    #[error("not following")]
    NotFollowing,

    #[error("post already retracted")]
    AlreadyRetracted,

    #[error("version conflict: {0}")]
    VersionConflict(String),

    // Authorization.
    #[error("caller is not authorized")]
    Unauthorized,

    // Infrastructure. Append failures before success are retriable; a
    // projection failure on an appended event is fatal for the projector
    // instance (recovery is replay).
    #[error("event log append failed: {0}")]
    LogAppend(String),

    #[error("projection failed: {0}")]
    Projection(String),

    #[error("deadline exceeded before append")]
    Deadline,
}

impl From<EventLogError> for CommandError {
    fn from(value: EventLogError) -> Self {
        match value {
            EventLogError::VersionConflict { .. } => Self::VersionConflict(value.to_string()),
            other => Self::LogAppend(other.to_string()),
        }
    }
}

impl From<ProjectionError> for CommandError {
    fn from(value: ProjectionError) -> Self {
        Self::Projection(value.to_string())
    }
}
