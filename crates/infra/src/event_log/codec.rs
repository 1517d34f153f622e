//! Binary codec for persisted event records.
//!
//! Layout (big-endian integers):
//!
//! - header: `event_id: 16B`, `aggregate_id: 16B`, `version: u64`,
//!   `kind: u8`, `occurred_at: i64` (nanoseconds since Unix epoch);
//! - body: kind-specific; variable-length strings are `u32`-length-prefixed
//!   UTF-8, embedded ids are 16B, timestamps are `i64` nanoseconds.
//!
//! A journal image is a `u64` record count followed by that many records.
//! Events of one aggregate appear in version order because the journal is
//! written in insertion order.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use murmur_core::{AggregateId, PostBody, UserId, Username};
use murmur_events::{
    DomainEvent, EventKind, EventRecord, FollowEnded, FollowStarted, PostPublished, PostRetracted,
    UserRegistered,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unknown event kind code {0}")]
    UnknownKind(u8),

    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    #[error("timestamp out of encodable range")]
    TimestampOutOfRange,

    #[error("trailing bytes after journal")]
    TrailingBytes,

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Encode one record, appending to `buf`.
pub fn encode_record(record: &EventRecord, buf: &mut Vec<u8>) -> Result<(), CodecError> {
    buf.extend_from_slice(record.event_id().as_bytes());
    buf.extend_from_slice(&record.aggregate_id().into_bytes());
    buf.extend_from_slice(&record.version().to_be_bytes());
    buf.push(record.kind().code());
    put_timestamp(record.occurred_at(), buf)?;

    match record.payload() {
        DomainEvent::UserRegistered(e) => {
            put_str(e.username.as_str(), buf);
        }
        DomainEvent::PostPublished(e) => {
            buf.extend_from_slice(&AggregateId::from(e.author_id).into_bytes());
            put_timestamp(e.published_at, buf)?;
            put_str(e.body.as_str(), buf);
        }
        DomainEvent::PostRetracted(_) => {}
        DomainEvent::FollowStarted(e) => {
            buf.extend_from_slice(&AggregateId::from(e.follower_id).into_bytes());
            buf.extend_from_slice(&AggregateId::from(e.followee_id).into_bytes());
        }
        DomainEvent::FollowEnded(e) => {
            buf.extend_from_slice(&AggregateId::from(e.follower_id).into_bytes());
            buf.extend_from_slice(&AggregateId::from(e.followee_id).into_bytes());
        }
    }

    Ok(())
}

/// Decode one record from the reader's current position.
pub fn decode_record(reader: &mut Reader<'_>) -> Result<EventRecord, CodecError> {
    let event_id = Uuid::from_bytes(reader.bytes16()?);
    let aggregate_id = AggregateId::from_bytes(reader.bytes16()?);
    let version = reader.u64()?;
    let kind_code = reader.u8()?;
    let occurred_at = reader.timestamp()?;

    let kind = EventKind::from_code(kind_code).ok_or(CodecError::UnknownKind(kind_code))?;
    let payload = match kind {
        EventKind::UserRegistered => {
            let username = Username::new(reader.string()?)
                .map_err(|e| CodecError::Corrupt(e.to_string()))?;
            DomainEvent::UserRegistered(UserRegistered { username })
        }
        EventKind::PostPublished => {
            let author_id = UserId::from(AggregateId::from_bytes(reader.bytes16()?));
            let published_at = reader.timestamp()?;
            let body =
                PostBody::new(reader.string()?).map_err(|e| CodecError::Corrupt(e.to_string()))?;
            DomainEvent::PostPublished(PostPublished {
                author_id,
                body,
                published_at,
            })
        }
        EventKind::PostRetracted => DomainEvent::PostRetracted(PostRetracted),
        EventKind::FollowStarted => {
            let follower_id = UserId::from(AggregateId::from_bytes(reader.bytes16()?));
            let followee_id = UserId::from(AggregateId::from_bytes(reader.bytes16()?));
            DomainEvent::FollowStarted(FollowStarted {
                follower_id,
                followee_id,
            })
        }
        EventKind::FollowEnded => {
            let follower_id = UserId::from(AggregateId::from_bytes(reader.bytes16()?));
            let followee_id = UserId::from(AggregateId::from_bytes(reader.bytes16()?));
            DomainEvent::FollowEnded(FollowEnded {
                follower_id,
                followee_id,
            })
        }
    };

    Ok(EventRecord::from_parts(
        event_id,
        aggregate_id,
        version,
        occurred_at,
        payload,
    ))
}

/// Encode a full journal (count-prefixed record sequence).
pub fn encode_journal(records: &[EventRecord]) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(records.len() as u64).to_be_bytes());
    for record in records {
        encode_record(record, &mut buf)?;
    }
    Ok(buf)
}

/// Decode a full journal; rejects trailing garbage.
pub fn decode_journal(bytes: &[u8]) -> Result<Vec<EventRecord>, CodecError> {
    let mut reader = Reader::new(bytes);
    let count = reader.u64()?;
    let mut records = Vec::with_capacity(count.min(1 << 20) as usize);
    for _ in 0..count {
        records.push(decode_record(&mut reader)?);
    }
    if !reader.is_empty() {
        return Err(CodecError::TrailingBytes);
    }
    Ok(records)
}

fn put_timestamp(at: DateTime<Utc>, buf: &mut Vec<u8>) -> Result<(), CodecError> {
    let nanos = at
        .timestamp_nanos_opt()
        .ok_or(CodecError::TimestampOutOfRange)?;
    buf.extend_from_slice(&nanos.to_be_bytes());
    Ok(())
}

fn put_str(s: &str, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Cursor over an encoded buffer.
pub struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.bytes.len() < n {
            return Err(CodecError::UnexpectedEof);
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        let raw: [u8; 4] = self.take(4)?.try_into().expect("exact slice");
        Ok(u32::from_be_bytes(raw))
    }

    fn u64(&mut self) -> Result<u64, CodecError> {
        let raw: [u8; 8] = self.take(8)?.try_into().expect("exact slice");
        Ok(u64::from_be_bytes(raw))
    }

    fn i64(&mut self) -> Result<i64, CodecError> {
        let raw: [u8; 8] = self.take(8)?.try_into().expect("exact slice");
        Ok(i64::from_be_bytes(raw))
    }

    fn bytes16(&mut self) -> Result<[u8; 16], CodecError> {
        Ok(self.take(16)?.try_into().expect("exact slice"))
    }

    fn timestamp(&mut self) -> Result<DateTime<Utc>, CodecError> {
        Ok(DateTime::from_timestamp_nanos(self.i64()?))
    }

    fn string(&mut self) -> Result<String, CodecError> {
        let len = self.u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}
