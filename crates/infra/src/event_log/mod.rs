//! Append-only event log boundary.
//!
//! The log is the authoritative state of the system: per-aggregate streams
//! with dense versions, plus a global time-ordered view for replay. Append
//! is the only mutation.

pub mod codec;
pub mod in_memory;
pub mod r#trait;

pub use codec::CodecError;
pub use in_memory::InMemoryEventLog;
pub use r#trait::{EventLog, EventLogError};
