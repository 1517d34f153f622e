//! Stored-record form of a domain event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use murmur_core::AggregateId;

use crate::event::{DomainEvent, EventKind};

/// An event together with its stream metadata. This is the unit of
/// emission, persistence, and projection.
///
/// `version` is 1-based and dense per aggregate stream; `occurred_at` is
/// wall-clock time assigned at emission and recorded verbatim, so replaying
/// the log reproduces the same global order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    event_id: Uuid,
    aggregate_id: AggregateId,
    version: u64,
    occurred_at: DateTime<Utc>,
    payload: DomainEvent,
}

impl EventRecord {
    /// Wrap a freshly-decided event, minting its unique id.
    pub fn emit(
        aggregate_id: AggregateId,
        version: u64,
        occurred_at: DateTime<Utc>,
        payload: DomainEvent,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            aggregate_id,
            version,
            occurred_at,
            payload,
        }
    }

    /// Reassemble a record from its stored parts (codec / replay path).
    pub fn from_parts(
        event_id: Uuid,
        aggregate_id: AggregateId,
        version: u64,
        occurred_at: DateTime<Utc>,
        payload: DomainEvent,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            version,
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &DomainEvent {
        &self.payload
    }

    pub fn into_payload(self) -> DomainEvent {
        self.payload
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
