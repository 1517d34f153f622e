use std::sync::Arc;

use thiserror::Error;

use murmur_core::AggregateId;
use murmur_events::EventRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventLogError {
    /// Optimistic concurrency check failed: an appended record's version
    /// did not continue the stream.
    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    /// The append batch was malformed (mixed aggregates, wrong stream key).
    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// Internal store failure (e.g. poisoned lock).
    #[error("event log internal error: {0}")]
    Internal(String),
}

/// Append-only event log.
///
/// - Per-aggregate append order equals version order.
/// - `read_all` is stable under replay: `occurred_at` is recorded verbatim,
///   ties broken by insertion order.
/// - No storage assumptions; the in-memory implementation is the reference,
///   and durable backends substitute behind this trait.
pub trait EventLog: Send + Sync {
    /// Append events atomically, in order, for one aggregate.
    ///
    /// The k-th record's `version` must equal the stream's current version
    /// plus k; a mismatch fails with [`EventLogError::VersionConflict`] and
    /// nothing is appended.
    fn append(
        &self,
        aggregate_id: AggregateId,
        events: Vec<EventRecord>,
    ) -> Result<(), EventLogError>;

    /// Full stream for one aggregate, in version order.
    fn read(&self, aggregate_id: AggregateId) -> Result<Vec<EventRecord>, EventLogError>;

    /// Every event in the log, ordered by `occurred_at` with insertion
    /// order as the tie-break.
    fn read_all(&self) -> Result<Vec<EventRecord>, EventLogError>;

    /// Whether any events exist for the aggregate.
    fn exists(&self, aggregate_id: AggregateId) -> Result<bool, EventLogError>;
}

impl<L> EventLog for Arc<L>
where
    L: EventLog + ?Sized,
{
    fn append(
        &self,
        aggregate_id: AggregateId,
        events: Vec<EventRecord>,
    ) -> Result<(), EventLogError> {
        (**self).append(aggregate_id, events)
    }

    fn read(&self, aggregate_id: AggregateId) -> Result<Vec<EventRecord>, EventLogError> {
        (**self).read(aggregate_id)
    }

    fn read_all(&self) -> Result<Vec<EventRecord>, EventLogError> {
        (**self).read_all()
    }

    fn exists(&self, aggregate_id: AggregateId) -> Result<bool, EventLogError> {
        (**self).exists(aggregate_id)
    }
}
