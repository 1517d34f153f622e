use chrono::{DateTime, Utc};

use murmur_core::{Aggregate, AggregateRoot, DomainError, DomainResult, PostBody, PostId, UserId};
use murmur_events::{DomainEvent, EventKind, EventRecord, PostPublished, PostRetracted};

/// Aggregate root: Post.
///
/// Lifecycle `Draft → Published → Retracted`; `Draft` is implicit (no
/// events yet) and `Retracted` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    id: PostId,
    author_id: Option<UserId>,
    body: Option<PostBody>,
    published_at: Option<DateTime<Utc>>,
    retracted: bool,
    version: u64,
    pending: Vec<EventRecord>,
}

impl Post {
    /// Create an empty, not-yet-published aggregate instance.
    pub fn empty(id: PostId) -> Self {
        Self {
            id,
            author_id: None,
            body: None,
            published_at: None,
            retracted: false,
            version: 0,
            pending: Vec::new(),
        }
    }

    /// Rebuild state from an event stream, in version order.
    ///
    /// Fails with [`DomainError::EmptyStream`] if the stream is empty or
    /// does not begin with `PostPublished`.
    pub fn rehydrate(stream: &[EventRecord]) -> DomainResult<Self> {
        let first = stream.first().ok_or(DomainError::EmptyStream)?;
        if first.kind() != EventKind::PostPublished {
            return Err(DomainError::EmptyStream);
        }

        let mut post = Self::empty(PostId::from(first.aggregate_id()));
        for record in stream {
            post.apply(record.payload());
        }
        Ok(post)
    }

    /// Decision: publish the post.
    ///
    /// Only valid on a fresh stream. `at` doubles as the publication time
    /// recorded in the event body.
    pub fn publish(
        &mut self,
        author_id: UserId,
        body: PostBody,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.version > 0 {
            return Err(DomainError::AlreadyCreated);
        }
        self.emit(
            DomainEvent::PostPublished(PostPublished {
                author_id,
                body,
                published_at: at,
            }),
            at,
        );
        Ok(())
    }

    /// Decision: retract the post.
    pub fn retract(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.version == 0 {
            return Err(DomainError::EmptyStream);
        }
        if self.retracted {
            return Err(DomainError::AlreadyRetracted);
        }
        self.emit(DomainEvent::PostRetracted(PostRetracted), at);
        Ok(())
    }

    /// Uncommitted events decided since rehydration; clears the buffer.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.pending)
    }

    pub fn author_id(&self) -> Option<UserId> {
        self.author_id
    }

    pub fn body(&self) -> Option<&PostBody> {
        self.body.as_ref()
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn is_retracted(&self) -> bool {
        self.retracted
    }

    fn emit(&mut self, payload: DomainEvent, at: DateTime<Utc>) {
        let record = EventRecord::emit(self.id.into(), self.version + 1, at, payload);
        self.apply(record.payload());
        self.pending.push(record);
    }
}

impl AggregateRoot for Post {
    type Id = PostId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for Post {
    type Event = DomainEvent;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DomainEvent::PostPublished(e) => {
                self.author_id = Some(e.author_id);
                self.body = Some(e.body.clone());
                self.published_at = Some(e.published_at);
                self.retracted = false;
            }
            DomainEvent::PostRetracted(_) => {
                self.retracted = true;
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
    use proptest::prelude::*;

    fn body(s: &str) -> PostBody {
        PostBody::new(s).unwrap()
    }

    #[test]
    fn publish_then_retract_walks_the_lifecycle() {
        let mut post = Post::empty(PostId::new());
        let author = UserId::new();
        let at = Utc::now();

        post.publish(author, body("hi"), at).unwrap();
        assert_eq!(post.author_id(), Some(author));
        assert_eq!(post.published_at(), Some(at));
        assert!(!post.is_retracted());
        assert_eq!(post.version(), 1);

        post.retract(Utc::now()).unwrap();
        assert!(post.is_retracted());
        assert_eq!(post.version(), 2);

        let drained = post.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].version(), 1);
        assert_eq!(drained[1].version(), 2);
        assert_eq!(drained[1].kind(), EventKind::PostRetracted);
    }

    #[test]
    fn publish_twice_is_rejected() {
        let mut post = Post::empty(PostId::new());
        post.publish(UserId::new(), body("a"), Utc::now()).unwrap();
        let err = post.publish(UserId::new(), body("b"), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::AlreadyCreated);
    }

    #[test]
    fn retract_twice_is_rejected() {
        let mut post = Post::empty(PostId::new());
        post.publish(UserId::new(), body("a"), Utc::now()).unwrap();
        post.retract(Utc::now()).unwrap();
        let err = post.retract(Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::AlreadyRetracted);
        assert_eq!(post.drain().len(), 2);
    }

    #[test]
    fn retract_on_draft_is_rejected() {
        let mut post = Post::empty(PostId::new());
        assert_eq!(post.retract(Utc::now()).unwrap_err(), DomainError::EmptyStream);
    }

    #[test]
    fn rehydrate_restores_a_retracted_post() {
        let mut post = Post::empty(PostId::new());
        post.publish(UserId::new(), body("gone soon"), Utc::now()).unwrap();
        post.retract(Utc::now()).unwrap();
        let stream = post.drain();

        let rebuilt = Post::rehydrate(&stream).unwrap();
        assert!(rebuilt.is_retracted());
        assert_eq!(rebuilt.version(), 2);
        assert_eq!(rebuilt.body(), Some(&body("gone soon")));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any valid decision sequence leaves a dense, 1-based
        /// version trail, and rehydrating from the drained stream
        /// reproduces the aggregate state exactly.
        #[test]
        fn drained_streams_are_dense_and_replayable(
            raw_body in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,279}",
            retract in any::<bool>(),
        ) {
            let mut post = Post::empty(PostId::new());
            let author = UserId::new();
            post.publish(author, PostBody::new(raw_body).unwrap(), Utc::now()).unwrap();
            if retract {
                post.retract(Utc::now()).unwrap();
            }

            let stream = post.drain();
            for (idx, record) in stream.iter().enumerate() {
                prop_assert_eq!(record.version(), idx as u64 + 1);
            }

            let rebuilt = Post::rehydrate(&stream).unwrap();
            prop_assert_eq!(rebuilt.version(), post.version());
            prop_assert_eq!(rebuilt.is_retracted(), post.is_retracted());
            prop_assert_eq!(rebuilt.author_id(), Some(author));
        }
    }

    #[test]
    fn rehydrate_rejects_empty_or_foreign_streams() {
        assert_eq!(Post::rehydrate(&[]).unwrap_err(), DomainError::EmptyStream);

        let mut user = crate::User::empty(UserId::new());
        user.register(murmur_core::Username::new("carol").unwrap(), Utc::now())
            .unwrap();
        assert_eq!(
            Post::rehydrate(&user.drain()).unwrap_err(),
            DomainError::EmptyStream
        );
    }
}
