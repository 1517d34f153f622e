//! Domain events: the closed event alphabet, its stored-record form, and
//! the pub/sub plumbing that carries committed records to consumers.

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod projection;
pub mod record;

pub use bus::{EventBus, Subscription};
pub use event::{
    DomainEvent, EventKind, FollowEnded, FollowStarted, PostPublished, PostRetracted,
    UserRegistered,
};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use projection::Projection;
pub use record::EventRecord;
