//! Infrastructure layer: event log, read store, projector, replay.

pub mod config;
pub mod event_log;
pub mod projector;
pub mod read_store;
pub mod replay;
pub mod workers;

pub use config::Tunables;
pub use event_log::{CodecError, EventLog, EventLogError, InMemoryEventLog};
pub use projector::{ProjectionError, Projector};
pub use read_store::{InMemoryReadStore, PostReadModel, ReadStore, UserProfile};
pub use replay::{rebuild, ReplayError, ReplayReport};
pub use workers::{ProjectionWorker, WorkerHandle};
