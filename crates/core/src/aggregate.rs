//! Aggregate root traits for event-sourced domain models.

/// Aggregate root marker + minimal interface.
///
/// Intentionally small so domain modules can decide how they model state
/// transitions without bringing in any infrastructure concerns.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Corresponds to the number of events applied (the stream revision).
    /// Zero means no events have been applied yet.
    fn version(&self) -> u64;
}

/// State evolution for an event-sourced aggregate.
///
/// `apply` must be total and deterministic: it is used both when replaying
/// history during rehydration and when an accepted decision is folded into
/// the in-memory state. Validation belongs in decision methods, never here.
pub trait Aggregate: AggregateRoot {
    /// Event alphabet this aggregate evolves under.
    type Event;

    /// Apply a single event to the in-memory state.
    ///
    /// Implementations increment [`AggregateRoot::version`] by exactly one
    /// per applied event.
    fn apply(&mut self, event: &Self::Event);
}
