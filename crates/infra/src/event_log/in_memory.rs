use std::collections::HashMap;
use std::sync::RwLock;

use murmur_core::AggregateId;
use murmur_events::EventRecord;

use super::codec::{self, CodecError};
use super::r#trait::{EventLog, EventLogError};

#[derive(Debug, Default)]
struct Inner {
    /// Per-aggregate streams, each in version order.
    streams: HashMap<AggregateId, Vec<EventRecord>>,
    /// Global journal in insertion order (the `read_all` tie-break).
    journal: Vec<EventRecord>,
}

/// In-memory append-only event log.
///
/// Streams and the global journal are updated under one write lock, so an
/// append is atomic with respect to both views.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    inner: RwLock<Inner>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize the full journal through the persisted-record codec.
    ///
    /// This is the durability seam: the byte layout is the on-disk format,
    /// so a durable backend can be swapped in without changing semantics.
    pub fn snapshot(&self) -> Result<Vec<u8>, CodecError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| CodecError::Corrupt("lock poisoned".to_string()))?;
        codec::encode_journal(&inner.journal)
    }

    /// Rebuild a log from a [`snapshot`](Self::snapshot) byte image.
    pub fn restore(bytes: &[u8]) -> Result<Self, CodecError> {
        let journal = codec::decode_journal(bytes)?;

        let mut streams: HashMap<AggregateId, Vec<EventRecord>> = HashMap::new();
        for record in &journal {
            let stream = streams.entry(record.aggregate_id()).or_default();
            let expected = stream.len() as u64 + 1;
            if record.version() != expected {
                return Err(CodecError::Corrupt(format!(
                    "stream {} is not dense: expected version {expected}, found {}",
                    record.aggregate_id(),
                    record.version()
                )));
            }
            stream.push(record.clone());
        }

        Ok(Self {
            inner: RwLock::new(Inner { streams, journal }),
        })
    }

    fn current_version(stream: &[EventRecord]) -> u64 {
        stream.last().map(|e| e.version()).unwrap_or(0)
    }
}

impl EventLog for InMemoryEventLog {
    fn append(
        &self,
        aggregate_id: AggregateId,
        events: Vec<EventRecord>,
    ) -> Result<(), EventLogError> {
        if events.is_empty() {
            return Ok(());
        }

        // All events must target the given aggregate stream.
        for (idx, e) in events.iter().enumerate() {
            if e.aggregate_id() != aggregate_id {
                return Err(EventLogError::InvalidAppend(format!(
                    "batch contains a foreign aggregate_id (index {idx})"
                )));
            }
        }

        let mut inner = self
            .inner
            .write()
            .map_err(|_| EventLogError::Internal("lock poisoned".to_string()))?;

        let current = inner
            .streams
            .get(&aggregate_id)
            .map(|s| Self::current_version(s))
            .unwrap_or(0);

        // Versions must continue the stream densely; reject the whole batch
        // on the first mismatch so nothing is partially applied.
        for (k, e) in events.iter().enumerate() {
            let expected = current + k as u64 + 1;
            if e.version() != expected {
                return Err(EventLogError::VersionConflict {
                    expected,
                    found: e.version(),
                });
            }
        }

        let stream = inner.streams.entry(aggregate_id).or_default();
        stream.extend(events.iter().cloned());
        inner.journal.extend(events);

        Ok(())
    }

    fn read(&self, aggregate_id: AggregateId) -> Result<Vec<EventRecord>, EventLogError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| EventLogError::Internal("lock poisoned".to_string()))?;

        Ok(inner.streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    fn read_all(&self) -> Result<Vec<EventRecord>, EventLogError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| EventLogError::Internal("lock poisoned".to_string()))?;

        // Stable sort: insertion order breaks occurred_at ties.
        let mut all = inner.journal.clone();
        all.sort_by_key(|e| e.occurred_at());
        Ok(all)
    }

    fn exists(&self, aggregate_id: AggregateId) -> Result<bool, EventLogError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| EventLogError::Internal("lock poisoned".to_string()))?;

        Ok(inner.streams.contains_key(&aggregate_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use murmur_core::Username;
    use murmur_events::{DomainEvent, PostRetracted, UserRegistered};

    fn registered(aggregate: AggregateId, version: u64, name: &str) -> EventRecord {
        EventRecord::emit(
            aggregate,
            version,
            Utc::now(),
            DomainEvent::UserRegistered(UserRegistered {
                username: Username::new(name).unwrap(),
            }),
        )
    }

    #[test]
    fn append_then_read_preserves_version_order() {
        let log = InMemoryEventLog::new();
        let aggregate = AggregateId::new();

        log.append(aggregate, vec![registered(aggregate, 1, "alice")])
            .unwrap();
        log.append(
            aggregate,
            vec![EventRecord::emit(
                aggregate,
                2,
                Utc::now(),
                DomainEvent::PostRetracted(PostRetracted),
            )],
        )
        .unwrap();

        let stream = log.read(aggregate).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream[0].version(), 1);
        assert_eq!(stream[1].version(), 2);
        assert!(log.exists(aggregate).unwrap());
        assert!(!log.exists(AggregateId::new()).unwrap());
    }

    #[test]
    fn version_gap_is_a_conflict() {
        let log = InMemoryEventLog::new();
        let aggregate = AggregateId::new();

        log.append(aggregate, vec![registered(aggregate, 1, "alice")])
            .unwrap();

        let err = log
            .append(aggregate, vec![registered(aggregate, 3, "alice")])
            .unwrap_err();
        assert_eq!(err, EventLogError::VersionConflict { expected: 2, found: 3 });

        // Nothing was appended.
        assert_eq!(log.read(aggregate).unwrap().len(), 1);
    }

    #[test]
    fn stale_version_is_a_conflict() {
        let log = InMemoryEventLog::new();
        let aggregate = AggregateId::new();

        log.append(aggregate, vec![registered(aggregate, 1, "alice")])
            .unwrap();
        let err = log
            .append(aggregate, vec![registered(aggregate, 1, "alice")])
            .unwrap_err();
        assert_eq!(err, EventLogError::VersionConflict { expected: 2, found: 1 });
    }

    #[test]
    fn batches_may_not_mix_aggregates() {
        let log = InMemoryEventLog::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        let err = log
            .append(a, vec![registered(a, 1, "alice"), registered(b, 1, "bob")])
            .unwrap_err();
        assert!(matches!(err, EventLogError::InvalidAppend(_)));
        assert!(!log.exists(a).unwrap());
    }

    #[test]
    fn read_all_orders_by_time_then_insertion() {
        let log = InMemoryEventLog::new();
        let a = AggregateId::new();
        let b = AggregateId::new();
        let c = AggregateId::new();

        let t0 = Utc::now();
        let later = EventRecord::emit(
            a,
            1,
            t0 + Duration::seconds(10),
            DomainEvent::PostRetracted(PostRetracted),
        );
        let early_first = EventRecord::emit(b, 1, t0, DomainEvent::PostRetracted(PostRetracted));
        let early_second = EventRecord::emit(c, 1, t0, DomainEvent::PostRetracted(PostRetracted));

        log.append(a, vec![later.clone()]).unwrap();
        log.append(b, vec![early_first.clone()]).unwrap();
        log.append(c, vec![early_second.clone()]).unwrap();

        let all = log.read_all().unwrap();
        let ids: Vec<_> = all.iter().map(|e| e.event_id()).collect();
        assert_eq!(
            ids,
            vec![
                early_first.event_id(),
                early_second.event_id(),
                later.event_id()
            ]
        );
    }

    #[test]
    fn snapshot_restore_round_trips_streams_and_journal() {
        let log = InMemoryEventLog::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        log.append(a, vec![registered(a, 1, "alice")]).unwrap();
        log.append(b, vec![registered(b, 1, "bob")]).unwrap();
        log.append(
            a,
            vec![EventRecord::emit(
                a,
                2,
                Utc::now(),
                DomainEvent::PostRetracted(PostRetracted),
            )],
        )
        .unwrap();

        let bytes = log.snapshot().unwrap();
        let restored = InMemoryEventLog::restore(&bytes).unwrap();

        assert_eq!(restored.read(a).unwrap(), log.read(a).unwrap());
        assert_eq!(restored.read(b).unwrap(), log.read(b).unwrap());
        assert_eq!(restored.read_all().unwrap(), log.read_all().unwrap());
    }
}
