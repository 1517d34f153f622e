//! Command execution pipeline (application-level orchestration).
//!
//! Flow per command:
//! preconditions (read store) → load/create aggregate → decide →
//! deadline check → append → project inline → ack.
//!
//! Projection runs on the append path, so a caller that acks a command
//! observes its effects on the very next query (read-your-writes).
//! Mutating commands are serialized end-to-end; queries run in parallel
//! against the read store.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use murmur_core::{AggregateId, DomainError, PostBody, PostId, RelationshipId, UserId, Username};
use murmur_domain::{FollowRelationship, Post, User};
use murmur_events::EventRecord;
use murmur_infra::{
    rebuild, EventLog, InMemoryEventLog, InMemoryReadStore, Projector, ReadStore, ReplayError,
    ReplayReport, Tunables,
};

use crate::commands::{
    Command, CommandAck, EndFollow, PublishPost, RegisterUser, RetractPost, StartFollow,
};
use crate::error::CommandError;

/// Process-wide application core: event log, read store (behind the
/// projector), and the handlers that drive them.
///
/// Constructed once and passed explicitly; aggregates are transient and
/// live only inside a handler invocation.
pub struct App<L, S> {
    log: L,
    projector: Projector<S>,
    /// Serializes mutating commands from decision through projection, so
    /// emission order, append order, and projection order coincide and the
    /// log replays to the same state the live run produced. Queries never
    /// take it.
    serial: Mutex<()>,
}

impl App<InMemoryEventLog, InMemoryReadStore> {
    /// Fully in-memory composition (the reference configuration).
    pub fn in_memory(tunables: Tunables) -> Self {
        Self::new(
            InMemoryEventLog::new(),
            Projector::new(InMemoryReadStore::new(tunables)),
        )
    }
}

impl<L, S> App<L, S>
where
    L: EventLog,
    S: ReadStore,
{
    pub fn new(log: L, projector: Projector<S>) -> Self {
        Self {
            log,
            projector,
            serial: Mutex::new(()),
        }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn read_store(&self) -> &S {
        self.projector.store()
    }

    pub fn projector(&self) -> &Projector<S> {
        &self.projector
    }

    /// Rebuild the read store by replaying the full log (startup recovery).
    pub fn recover(&self) -> Result<ReplayReport, ReplayError> {
        rebuild(&self.log, &self.projector)
    }

    /// Single entry point for the accept → store → project → ack loop.
    pub fn dispatch(&self, command: Command) -> Result<CommandAck, CommandError> {
        match command {
            Command::RegisterUser(cmd) => self.register_user(cmd).map(CommandAck::UserRegistered),
            Command::PublishPost(cmd) => self.publish_post(cmd).map(CommandAck::PostPublished),
            Command::RetractPost(cmd) => self.retract_post(cmd).map(|_| CommandAck::PostRetracted),
            Command::StartFollow(cmd) => self.start_follow(cmd).map(CommandAck::FollowStarted),
            Command::EndFollow(cmd) => self.end_follow(cmd).map(|_| CommandAck::FollowEnded),
        }
    }

    /// Register a new user under a globally unique username.
    pub fn register_user(&self, cmd: RegisterUser) -> Result<UserId, CommandError> {
        let _serial = self.serialize_commands()?;
        let username = Username::new(cmd.username).map_err(map_validation)?;

        if self.read_store().find_profile_by_username(&username).is_some() {
            return Err(CommandError::UsernameTaken(username.to_string()));
        }

        let user_id = UserId::new();
        let mut user = User::empty(user_id);
        user.register(username, Utc::now()).map_err(map_validation)?;

        self.commit(user_id.into(), user.drain(), cmd.deadline)?;
        debug!(%user_id, "user registered");
        Ok(user_id)
    }

    /// Publish a post as an existing user.
    pub fn publish_post(&self, cmd: PublishPost) -> Result<PostId, CommandError> {
        let _serial = self.serialize_commands()?;
        if self.read_store().profile(cmd.author_id).is_none() {
            return Err(CommandError::UserNotFound(cmd.author_id));
        }
        let body = PostBody::new(cmd.body).map_err(map_validation)?;

        let post_id = PostId::new();
        let mut post = Post::empty(post_id);
        post.publish(cmd.author_id, body, Utc::now())
            .map_err(map_validation)?;

        self.commit(post_id.into(), post.drain(), cmd.deadline)?;
        debug!(%post_id, author_id = %cmd.author_id, "post published");
        Ok(post_id)
    }

    /// Retract a post; only the author may retract, and only once.
    pub fn retract_post(&self, cmd: RetractPost) -> Result<(), CommandError> {
        let _serial = self.serialize_commands()?;
        let view = self
            .read_store()
            .post(cmd.post_id)
            .ok_or(CommandError::PostNotFound(cmd.post_id))?;
        if view.author_id != cmd.caller_id {
            return Err(CommandError::Unauthorized);
        }

        let stream = self.log.read(cmd.post_id.into())?;
        let mut post =
            Post::rehydrate(&stream).map_err(|_| CommandError::PostNotFound(cmd.post_id))?;
        post.retract(Utc::now()).map_err(|e| match e {
            DomainError::AlreadyRetracted => CommandError::AlreadyRetracted,
            other => map_validation(other),
        })?;

        self.commit(cmd.post_id.into(), post.drain(), cmd.deadline)?;
        debug!(post_id = %cmd.post_id, "post retracted");
        Ok(())
    }

    /// Start following another user.
    pub fn start_follow(&self, cmd: StartFollow) -> Result<RelationshipId, CommandError> {
        let _serial = self.serialize_commands()?;
        let store = self.read_store();
        for user in [cmd.follower_id, cmd.followee_id] {
            if store.profile(user).is_none() {
                return Err(CommandError::UserNotFound(user));
            }
        }
        if cmd.follower_id == cmd.followee_id {
            return Err(CommandError::SelfFollow);
        }
        if store.is_following(cmd.follower_id, cmd.followee_id) {
            return Err(CommandError::AlreadyFollowing);
        }

        let relationship_id = RelationshipId::new();
        let mut relationship = FollowRelationship::empty(relationship_id);
        relationship
            .start(cmd.follower_id, cmd.followee_id, Utc::now())
            .map_err(map_validation)?;

        self.commit(relationship_id.into(), relationship.drain(), cmd.deadline)?;
        debug!(
            follower_id = %cmd.follower_id,
            followee_id = %cmd.followee_id,
            "follow started"
        );
        Ok(relationship_id)
    }

    /// Stop following another user.
    pub fn end_follow(&self, cmd: EndFollow) -> Result<(), CommandError> {
        let _serial = self.serialize_commands()?;
        let store = self.read_store();
        for user in [cmd.follower_id, cmd.followee_id] {
            if store.profile(user).is_none() {
                return Err(CommandError::UserNotFound(user));
            }
        }
        let relationship_id = store
            .relationship_of(cmd.follower_id, cmd.followee_id)
            .ok_or(CommandError::NotFollowing)?;

        let stream = self.log.read(relationship_id.into())?;
        let mut relationship = FollowRelationship::rehydrate(&stream)
            .map_err(|_| CommandError::RelationshipNotFound)?;
        relationship.end(Utc::now()).map_err(|e| match e {
            DomainError::NotActive => CommandError::NotFollowing,
            other => map_validation(other),
        })?;

        self.commit(relationship_id.into(), relationship.drain(), cmd.deadline)?;
        debug!(
            follower_id = %cmd.follower_id,
            followee_id = %cmd.followee_id,
            "follow ended"
        );
        Ok(())
    }

    fn serialize_commands(&self) -> Result<MutexGuard<'_, ()>, CommandError> {
        self.serial
            .lock()
            .map_err(|_| CommandError::LogAppend("command serialization lock poisoned".to_string()))
    }

    /// Append drained events and project them inline.
    ///
    /// The deadline is checked here, immediately before append: past this
    /// point the events are authoritative and projection is not
    /// cancellable.
    fn commit(
        &self,
        aggregate_id: AggregateId,
        events: Vec<EventRecord>,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<(), CommandError> {
        if deadline.is_some_and(|d| Utc::now() > d) {
            return Err(CommandError::Deadline);
        }

        self.log.append(aggregate_id, events.clone())?;
        self.projector.apply_all(&events)?;
        Ok(())
    }
}

/// Map deterministic domain failures onto the boundary surface.
fn map_validation(err: DomainError) -> CommandError {
    match err {
        DomainError::InvalidUsername(msg) | DomainError::InvalidId(msg) => {
            CommandError::InvalidUsername(msg)
        }
        DomainError::InvalidBody(msg) => CommandError::InvalidBody(msg),
        DomainError::SelfFollow => CommandError::SelfFollow,
        DomainError::AlreadyRetracted => CommandError::AlreadyRetracted,
        DomainError::NotActive => CommandError::NotFollowing,
        // A create decision on an existing stream or a decision on a
        // missing stream is a concurrency artifact at this layer.
        DomainError::AlreadyCreated | DomainError::EmptyStream => CommandError::VersionConflict(
            "aggregate stream changed underneath the command".to_string(),
        ),
    }
}
