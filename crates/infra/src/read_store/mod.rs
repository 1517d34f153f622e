//! Read-side storage boundary.
//!
//! Everything in here is a projection of the event log: disposable,
//! rebuildable by replay, and queried directly by the read side.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryReadStore;
pub use r#trait::{PostReadModel, ReadStore, UserProfile};
