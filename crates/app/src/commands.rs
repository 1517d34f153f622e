//! Command surface.
//!
//! Commands are transient intent; accepted commands become events. Every
//! command carries an optional deadline, checked immediately before the
//! append step: an expired command fails with `Deadline` and leaves no
//! trace, while an appended event is authoritative and its projection can
//! no longer be cancelled.

use chrono::{DateTime, Utc};

use murmur_core::{PostId, RelationshipId, UserId};

/// Command: register a new user under a unique username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUser {
    pub username: String,
    pub deadline: Option<DateTime<Utc>>,
}

impl RegisterUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            deadline: None,
        }
    }
}

/// Command: publish a post as an existing user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPost {
    pub author_id: UserId,
    pub body: String,
    pub deadline: Option<DateTime<Utc>>,
}

impl PublishPost {
    pub fn new(author_id: UserId, body: impl Into<String>) -> Self {
        Self {
            author_id,
            body: body.into(),
            deadline: None,
        }
    }
}

/// Command: retract a post; only its author may do so.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetractPost {
    pub post_id: PostId,
    pub caller_id: UserId,
    pub deadline: Option<DateTime<Utc>>,
}

impl RetractPost {
    pub fn new(post_id: PostId, caller_id: UserId) -> Self {
        Self {
            post_id,
            caller_id,
            deadline: None,
        }
    }
}

/// Command: start following another user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartFollow {
    pub follower_id: UserId,
    pub followee_id: UserId,
    pub deadline: Option<DateTime<Utc>>,
}

impl StartFollow {
    pub fn new(follower_id: UserId, followee_id: UserId) -> Self {
        Self {
            follower_id,
            followee_id,
            deadline: None,
        }
    }
}

/// Command: stop following another user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndFollow {
    pub follower_id: UserId,
    pub followee_id: UserId,
    pub deadline: Option<DateTime<Utc>>,
}

impl EndFollow {
    pub fn new(follower_id: UserId, followee_id: UserId) -> Self {
        Self {
            follower_id,
            followee_id,
            deadline: None,
        }
    }
}

/// The full command alphabet, for callers driving the accept → store →
/// project → ack loop through one entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RegisterUser(RegisterUser),
    PublishPost(PublishPost),
    RetractPost(RetractPost),
    StartFollow(StartFollow),
    EndFollow(EndFollow),
}

/// Acknowledgement of a completed command (appended and projected).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAck {
    UserRegistered(UserId),
    PostPublished(PostId),
    PostRetracted,
    FollowStarted(RelationshipId),
    FollowEnded,
}
