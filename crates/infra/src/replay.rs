//! Read-store recovery by replaying the event log.

use thiserror::Error;
use tracing::info;

use crate::event_log::{EventLog, EventLogError};
use crate::projector::{ProjectionError, Projector};
use crate::read_store::ReadStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error(transparent)]
    Log(#[from] EventLogError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Outcome of a completed rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    pub events_replayed: u64,
}

/// Rebuild the read store from scratch: clear it, then feed the full log
/// through the projector in global order.
///
/// Idempotent: profile insertion is an upsert, publishing re-fans-out to
/// the follower set as of that point in the replayed order, and timeline
/// truncation is deterministic. Projection of an appended event cannot be
/// cancelled, so there is no partial-rebuild mode; a failure means the log
/// itself is bad.
pub fn rebuild<L, S>(log: &L, projector: &Projector<S>) -> Result<ReplayReport, ReplayError>
where
    L: EventLog,
    S: ReadStore,
{
    projector.store().clear();

    let records = log.read_all()?;
    murmur_events::projection::run(projector, &records)?;

    let report = ReplayReport {
        events_replayed: records.len() as u64,
    };
    info!(events = report.events_replayed, "read store rebuilt from log");
    Ok(report)
}
