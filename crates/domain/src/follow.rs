use chrono::{DateTime, Utc};

use murmur_core::{Aggregate, AggregateRoot, DomainError, DomainResult, RelationshipId, UserId};
use murmur_events::{DomainEvent, EventKind, EventRecord, FollowEnded, FollowStarted};

/// Aggregate root: FollowRelationship.
///
/// Lifecycle `Absent → Active → Ended`. `Ended` is terminal for this
/// identity; re-following mints a fresh relationship id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowRelationship {
    id: RelationshipId,
    follower_id: Option<UserId>,
    followee_id: Option<UserId>,
    active: bool,
    version: u64,
    pending: Vec<EventRecord>,
}

impl FollowRelationship {
    /// Create an empty, not-yet-started aggregate instance.
    pub fn empty(id: RelationshipId) -> Self {
        Self {
            id,
            follower_id: None,
            followee_id: None,
            active: false,
            version: 0,
            pending: Vec::new(),
        }
    }

    /// Rebuild state from an event stream, in version order.
    ///
    /// Fails with [`DomainError::EmptyStream`] if the stream is empty or
    /// does not begin with `FollowStarted`.
    pub fn rehydrate(stream: &[EventRecord]) -> DomainResult<Self> {
        let first = stream.first().ok_or(DomainError::EmptyStream)?;
        if first.kind() != EventKind::FollowStarted {
            return Err(DomainError::EmptyStream);
        }

        let mut rel = Self::empty(RelationshipId::from(first.aggregate_id()));
        for record in stream {
            rel.apply(record.payload());
        }
        Ok(rel)
    }

    /// Decision: start the follow.
    ///
    /// Only valid on a fresh stream; a user cannot follow themselves.
    pub fn start(
        &mut self,
        follower_id: UserId,
        followee_id: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.version > 0 {
            return Err(DomainError::AlreadyCreated);
        }
        if follower_id == followee_id {
            return Err(DomainError::SelfFollow);
        }
        self.emit(
            DomainEvent::FollowStarted(FollowStarted {
                follower_id,
                followee_id,
            }),
            at,
        );
        Ok(())
    }

    /// Decision: end the follow.
    pub fn end(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if !self.active {
            return Err(DomainError::NotActive);
        }
        // Both ids are set whenever the relationship is active.
        let (follower_id, followee_id) = match (self.follower_id, self.followee_id) {
            (Some(f), Some(e)) => (f, e),
            _ => return Err(DomainError::NotActive),
        };
        self.emit(
            DomainEvent::FollowEnded(FollowEnded {
                follower_id,
                followee_id,
            }),
            at,
        );
        Ok(())
    }

    /// Uncommitted events decided since rehydration; clears the buffer.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.pending)
    }

    pub fn follower_id(&self) -> Option<UserId> {
        self.follower_id
    }

    pub fn followee_id(&self) -> Option<UserId> {
        self.followee_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn emit(&mut self, payload: DomainEvent, at: DateTime<Utc>) {
        let record = EventRecord::emit(self.id.into(), self.version + 1, at, payload);
        self.apply(record.payload());
        self.pending.push(record);
    }
}

impl AggregateRoot for FollowRelationship {
    type Id = RelationshipId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for FollowRelationship {
    type Event = DomainEvent;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DomainEvent::FollowStarted(e) => {
                self.follower_id = Some(e.follower_id);
                self.followee_id = Some(e.followee_id);
                self.active = true;
            }
            DomainEvent::FollowEnded(_) => {
                self.active = false;
            }
            _ => {}
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_then_end_walks_the_lifecycle() {
        let mut rel = FollowRelationship::empty(RelationshipId::new());
        let follower = UserId::new();
        let followee = UserId::new();

        rel.start(follower, followee, Utc::now()).unwrap();
        assert!(rel.is_active());
        assert_eq!(rel.follower_id(), Some(follower));
        assert_eq!(rel.followee_id(), Some(followee));
        assert_eq!(rel.version(), 1);

        rel.end(Utc::now()).unwrap();
        assert!(!rel.is_active());
        assert_eq!(rel.version(), 2);

        let drained = rel.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[1].kind(), EventKind::FollowEnded);
        match drained[1].payload() {
            DomainEvent::FollowEnded(e) => {
                assert_eq!(e.follower_id, follower);
                assert_eq!(e.followee_id, followee);
            }
            other => panic!("expected FollowEnded, got {other:?}"),
        }
    }

    #[test]
    fn self_follow_is_rejected() {
        let mut rel = FollowRelationship::empty(RelationshipId::new());
        let user = UserId::new();
        let err = rel.start(user, user, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::SelfFollow);
        assert!(rel.drain().is_empty());
    }

    #[test]
    fn starting_twice_is_rejected() {
        let mut rel = FollowRelationship::empty(RelationshipId::new());
        rel.start(UserId::new(), UserId::new(), Utc::now()).unwrap();
        let err = rel.start(UserId::new(), UserId::new(), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::AlreadyCreated);
    }

    #[test]
    fn ending_twice_is_rejected() {
        let mut rel = FollowRelationship::empty(RelationshipId::new());
        rel.start(UserId::new(), UserId::new(), Utc::now()).unwrap();
        rel.end(Utc::now()).unwrap();
        assert_eq!(rel.end(Utc::now()).unwrap_err(), DomainError::NotActive);
    }

    #[test]
    fn ending_before_starting_is_rejected() {
        let mut rel = FollowRelationship::empty(RelationshipId::new());
        assert_eq!(rel.end(Utc::now()).unwrap_err(), DomainError::NotActive);
    }

    #[test]
    fn rehydrate_restores_an_ended_relationship() {
        let mut rel = FollowRelationship::empty(RelationshipId::new());
        let follower = UserId::new();
        let followee = UserId::new();
        rel.start(follower, followee, Utc::now()).unwrap();
        rel.end(Utc::now()).unwrap();
        let stream = rel.drain();

        let rebuilt = FollowRelationship::rehydrate(&stream).unwrap();
        assert!(!rebuilt.is_active());
        assert_eq!(rebuilt.follower_id(), Some(follower));
        assert_eq!(rebuilt.version(), 2);
    }

    #[test]
    fn rehydrate_rejects_empty_stream() {
        assert_eq!(
            FollowRelationship::rehydrate(&[]).unwrap_err(),
            DomainError::EmptyStream
        );
    }
}
