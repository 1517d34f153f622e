use chrono::{DateTime, Utc};

use murmur_core::{Aggregate, AggregateRoot, DomainError, DomainResult, UserId, Username};
use murmur_events::{DomainEvent, EventKind, EventRecord, UserRegistered};

/// Aggregate root: User.
///
/// Created by `UserRegistered` and never destroyed; there are no further
/// mutating events in the current core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    username: Option<Username>,
    version: u64,
    created: bool,
    pending: Vec<EventRecord>,
}

impl User {
    /// Create an empty, not-yet-registered aggregate instance.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            username: None,
            version: 0,
            created: false,
            pending: Vec::new(),
        }
    }

    /// Rebuild state from an event stream, in version order.
    ///
    /// Fails with [`DomainError::EmptyStream`] if the stream is empty or
    /// does not begin with `UserRegistered`.
    pub fn rehydrate(stream: &[EventRecord]) -> DomainResult<Self> {
        let first = stream.first().ok_or(DomainError::EmptyStream)?;
        if first.kind() != EventKind::UserRegistered {
            return Err(DomainError::EmptyStream);
        }

        let mut user = Self::empty(UserId::from(first.aggregate_id()));
        for record in stream {
            user.apply(record.payload());
        }
        Ok(user)
    }

    /// Decision: register the user.
    ///
    /// Only valid on a fresh stream.
    pub fn register(&mut self, username: Username, at: DateTime<Utc>) -> DomainResult<()> {
        if self.created {
            return Err(DomainError::AlreadyCreated);
        }
        self.emit(
            DomainEvent::UserRegistered(UserRegistered { username }),
            at,
        );
        Ok(())
    }

    /// Uncommitted events decided since rehydration; clears the buffer.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.pending)
    }

    pub fn username(&self) -> Option<&Username> {
        self.username.as_ref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    fn emit(&mut self, payload: DomainEvent, at: DateTime<Utc>) {
        let record = EventRecord::emit(self.id.into(), self.version + 1, at, payload);
        self.apply(record.payload());
        self.pending.push(record);
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for User {
    type Event = DomainEvent;

    fn apply(&mut self, event: &Self::Event) {
        if let DomainEvent::UserRegistered(e) = event {
            self.username = Some(e.username.clone());
            self.created = true;
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Username {
        Username::new(s).unwrap()
    }

    #[test]
    fn register_emits_and_applies_in_one_step() {
        let mut user = User::empty(UserId::new());
        user.register(name("alice"), Utc::now()).unwrap();

        assert!(user.is_created());
        assert_eq!(user.username(), Some(&name("alice")));
        assert_eq!(user.version(), 1);

        let drained = user.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].version(), 1);
        assert_eq!(drained[0].kind(), EventKind::UserRegistered);
        assert!(user.drain().is_empty());
    }

    #[test]
    fn register_twice_is_rejected() {
        let mut user = User::empty(UserId::new());
        user.register(name("alice"), Utc::now()).unwrap();
        let err = user.register(name("alice2"), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::AlreadyCreated);
        assert_eq!(user.drain().len(), 1);
    }

    #[test]
    fn rehydrate_restores_state_from_drained_events() {
        let mut user = User::empty(UserId::new());
        user.register(name("bob"), Utc::now()).unwrap();
        let stream = user.drain();

        let rebuilt = User::rehydrate(&stream).unwrap();
        assert_eq!(rebuilt.username(), Some(&name("bob")));
        assert_eq!(rebuilt.version(), 1);
        assert_eq!(rebuilt.id(), user.id());
    }

    #[test]
    fn rehydrate_rejects_empty_stream() {
        assert_eq!(User::rehydrate(&[]).unwrap_err(), DomainError::EmptyStream);
    }

    #[test]
    fn rehydrate_rejects_foreign_first_event() {
        use murmur_events::PostRetracted;

        let record = EventRecord::emit(
            UserId::new().into(),
            1,
            Utc::now(),
            DomainEvent::PostRetracted(PostRetracted),
        );
        assert_eq!(
            User::rehydrate(&[record]).unwrap_err(),
            DomainError::EmptyStream
        );
    }
}
