//! Event → read-state transitions, including fan-out, backfill, cleanup.
//!
//! The projector consumes newly-appended events in global append order and
//! updates the read store. It is deterministic: replaying the full log into
//! an empty store reproduces an observationally-equivalent state.

use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

use murmur_core::{PostId, RelationshipId, UserId};
use murmur_events::{
    DomainEvent, EventRecord, FollowEnded, FollowStarted, PostPublished, Projection,
};

use crate::read_store::{PostReadModel, ReadStore, UserProfile};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    /// A `PostPublished` event referenced an unregistered author. The log
    /// guarantees authors are registered first, so this indicates a corrupt
    /// log; the projector instance must not continue past it. Recovery is
    /// replay from a good log.
    #[error("post author {author_id} has no profile (corrupt log)")]
    MissingAuthor { author_id: UserId },

    /// Internal failure (e.g. poisoned step lock).
    #[error("projection internal error: {0}")]
    Internal(String),
}

/// Observer invoked after each successfully projected event.
pub type Observer = Box<dyn Fn(&EventRecord) + Send + Sync>;

/// Projects domain events into a read store.
///
/// A step mutex serializes projection: each event is one linearization
/// point in the global order, and readers see all of a step's read-store
/// mutations or none of them.
pub struct Projector<S> {
    store: S,
    step: Mutex<()>,
    observers: Vec<Observer>,
}

impl<S> Projector<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            step: Mutex::new(()),
            observers: Vec::new(),
        }
    }

    /// Register an observation hook, called after each projected event.
    pub fn with_observer(mut self, observer: impl Fn(&EventRecord) + Send + Sync + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> Projector<S>
where
    S: ReadStore,
{
    /// Project a single event record.
    pub fn apply(&self, record: &EventRecord) -> Result<(), ProjectionError> {
        let _step = self
            .step
            .lock()
            .map_err(|_| ProjectionError::Internal("step lock poisoned".to_string()))?;

        self.transition(record)?;

        for observer in &self.observers {
            observer(record);
        }

        Ok(())
    }

    /// Project records in order, stopping at the first failure.
    pub fn apply_all(&self, records: &[EventRecord]) -> Result<(), ProjectionError> {
        for record in records {
            self.apply(record)?;
        }
        Ok(())
    }

    fn transition(&self, record: &EventRecord) -> Result<(), ProjectionError> {
        match record.payload() {
            DomainEvent::UserRegistered(e) => {
                let user_id = UserId::from(record.aggregate_id());
                self.store.save_profile(UserProfile {
                    user_id,
                    username: e.username.clone(),
                });
                debug!(event = record.event_type(), %user_id, "projected");
            }
            DomainEvent::PostPublished(e) => {
                self.project_post_published(PostId::from(record.aggregate_id()), e)?;
            }
            DomainEvent::PostRetracted(_) => {
                self.project_post_retracted(PostId::from(record.aggregate_id()));
            }
            DomainEvent::FollowStarted(e) => {
                self.project_follow_started(RelationshipId::from(record.aggregate_id()), e);
            }
            DomainEvent::FollowEnded(e) => {
                self.project_follow_ended(e);
            }
        }
        Ok(())
    }

    fn project_post_published(
        &self,
        post_id: PostId,
        e: &PostPublished,
    ) -> Result<(), ProjectionError> {
        let author = self
            .store
            .profile(e.author_id)
            .ok_or(ProjectionError::MissingAuthor {
                author_id: e.author_id,
            })?;

        self.store.save_post(PostReadModel {
            post_id,
            author_id: e.author_id,
            author_username: author.username,
            body: e.body.clone(),
            published_at: e.published_at,
        });

        // Celebrity status is evaluated now, never retroactively.
        if self.store.is_celebrity(e.author_id) {
            self.store.mark_celebrity_post(post_id, e.author_id);
            debug!(event = "post.published", %post_id, "indexed celebrity post");
        } else {
            let followers = self.store.incoming(e.author_id);
            for follower in &followers {
                self.store.push_timeline(*follower, post_id);
            }
            debug!(event = "post.published", %post_id, fan_out = followers.len(), "fanned out");
        }

        Ok(())
    }

    fn project_post_retracted(&self, post_id: PostId) {
        // Absent post: already projected (or never published) — idempotent
        // recovery, not an error.
        let Some(post) = self.store.post(post_id) else {
            warn!(event = "post.retracted", %post_id, "post absent; skipping");
            return;
        };

        if self.store.forget_celebrity_post(post_id) {
            // Indexed at publication time; no timeline ever held it.
        } else {
            for follower in self.store.incoming(post.author_id) {
                self.store.remove_from_timeline(follower, post_id);
            }
        }

        self.store.delete_post(post_id);
        debug!(event = "post.retracted", %post_id, "projected");
    }

    fn project_follow_started(&self, relationship_id: RelationshipId, e: &FollowStarted) {
        self.store
            .add_edge(e.follower_id, e.followee_id, relationship_id);

        if self.store.is_celebrity(e.followee_id) {
            // Idempotent ensure; the new follower's timeline is untouched.
            for post in self.store.posts_by_author(e.followee_id) {
                self.store.mark_celebrity_post(post.post_id, e.followee_id);
            }
        } else {
            // Backfill oldest-to-newest: front-insertion then keeps the
            // timeline newest-first, and the bound keeps the newest posts.
            let posts = self.store.posts_by_author(e.followee_id);
            for post in posts.iter().rev() {
                self.store.push_timeline(e.follower_id, post.post_id);
            }
            debug!(
                event = "follow.started",
                follower = %e.follower_id,
                followee = %e.followee_id,
                backfilled = posts.len(),
                "projected"
            );
        }
    }

    fn project_follow_ended(&self, e: &FollowEnded) {
        self.store.remove_edge(e.follower_id, e.followee_id);

        if !self.store.is_celebrity(e.followee_id) {
            self.store
                .remove_author_from_timeline(e.follower_id, e.followee_id);
        }
        debug!(
            event = "follow.ended",
            follower = %e.follower_id,
            followee = %e.followee_id,
            "projected"
        );
    }
}

impl<S> Projection for Projector<S>
where
    S: ReadStore,
{
    type Error = ProjectionError;

    fn apply(&self, record: &EventRecord) -> Result<(), Self::Error> {
        Projector::apply(self, record)
    }
}
