//! The closed event alphabet.
//!
//! Events are facts: immutable, append-only, replayable. This system has
//! exactly five kinds, modelled as one closed sum type so the projector can
//! dispatch on tag and the compiler can prove every kind is handled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use murmur_core::{PostBody, UserId, Username};

/// Tag identifying an event kind.
///
/// The `u8` discriminants are part of the persisted record layout and must
/// never be renumbered; the dotted names are stable identifiers used for
/// routing and observability.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserRegistered = 1,
    PostPublished = 2,
    PostRetracted = 3,
    FollowStarted = 4,
    FollowEnded = 5,
}

impl EventKind {
    /// Stable wire code (see the event-record codec).
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::UserRegistered),
            2 => Some(Self::PostPublished),
            3 => Some(Self::PostRetracted),
            4 => Some(Self::FollowStarted),
            5 => Some(Self::FollowEnded),
            _ => None,
        }
    }

    /// Stable event name, `{aggregate}.{action}`.
    pub fn event_type(self) -> &'static str {
        match self {
            Self::UserRegistered => "user.registered",
            Self::PostPublished => "post.published",
            Self::PostRetracted => "post.retracted",
            Self::FollowStarted => "follow.started",
            Self::FollowEnded => "follow.ended",
        }
    }
}

/// Body: a user came into existence under a unique username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub username: Username,
}

/// Body: a post was published by an existing user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPublished {
    pub author_id: UserId,
    pub body: PostBody,
    pub published_at: DateTime<Utc>,
}

/// Body: a post was retracted by its author. The record header carries
/// everything this needs (`aggregate_id` is the post, `occurred_at` the
/// retraction time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRetracted;

/// Body: a follow edge became active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowStarted {
    pub follower_id: UserId,
    pub followee_id: UserId,
}

/// Body: a follow edge was ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEnded {
    pub follower_id: UserId,
    pub followee_id: UserId,
}

/// A domain event: one of the five kinds, with its kind-specific body.
///
/// The aggregate the event mutates lives in the record header, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum DomainEvent {
    UserRegistered(UserRegistered),
    PostPublished(PostPublished),
    PostRetracted(PostRetracted),
    FollowStarted(FollowStarted),
    FollowEnded(FollowEnded),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::UserRegistered(_) => EventKind::UserRegistered,
            Self::PostPublished(_) => EventKind::PostPublished,
            Self::PostRetracted(_) => EventKind::PostRetracted,
            Self::FollowStarted(_) => EventKind::FollowStarted,
            Self::FollowEnded(_) => EventKind::FollowEnded,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.kind().event_type()
    }
}
