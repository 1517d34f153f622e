//! Projection seam.

use crate::record::EventRecord;

/// A projection builds read-side state from an append-only event stream.
///
/// Implementations own their storage (typically behind interior
/// mutability); applying the full log to a fresh projection must reproduce
/// the same state (replayability).
pub trait Projection {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Apply a single event record.
    fn apply(&self, record: &EventRecord) -> Result<(), Self::Error>;
}

/// Feed records through a projection in order, stopping at the first
/// failure.
pub fn run<P: Projection>(projection: &P, records: &[EventRecord]) -> Result<(), P::Error> {
    for record in records {
        projection.apply(record)?;
    }
    Ok(())
}
