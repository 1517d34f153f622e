//! Background projection worker.
//!
//! The inline projection mode applies events on the append path. This
//! worker is the alternative: committed records are published to a bus and
//! projected on a dedicated thread, with [`WorkerHandle::wait_for`] as the
//! synchronization primitive a command handler uses before acking, so
//! read-your-writes survives the mode switch.

use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{error, warn};

use murmur_events::{EventBus, EventRecord, Subscription};

use crate::projector::Projector;
use crate::read_store::ReadStore;

#[derive(Debug)]
struct Progress {
    state: Mutex<ProgressState>,
    changed: Condvar,
}

#[derive(Debug, Copy, Clone)]
struct ProgressState {
    /// Number of records projected so far. Because the bus sequences
    /// publishes, this equals the sequence number of the last projected
    /// record.
    applied: u64,
    /// Set when the worker exits (shutdown or fatal projection failure).
    stopped: bool,
}

/// Handle to observe, await, and stop a projection worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    progress: Arc<Progress>,
}

impl WorkerHandle {
    /// Sequence number of the last projected record.
    pub fn applied(&self) -> u64 {
        match self.progress.state.lock() {
            Ok(state) => state.applied,
            Err(_) => 0,
        }
    }

    /// Block until the record published at `seq` has been projected.
    ///
    /// Returns `false` if the worker stopped before reaching it.
    pub fn wait_for(&self, seq: u64) -> bool {
        let Ok(mut state) = self.progress.state.lock() else {
            return false;
        };
        loop {
            if state.applied >= seq {
                return true;
            }
            if state.stopped {
                return false;
            }
            state = match self.progress.changed.wait(state) {
                Ok(s) => s,
                Err(_) => return false,
            };
        }
    }

    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Background projection worker loop.
///
/// - Subscribes to an event bus carrying committed records
/// - Applies each record through the projector, in publish order
/// - Supports graceful shutdown
/// - Stops permanently on a projection failure (an appended event that
///   cannot be projected means the instance must be rebuilt by replay)
#[derive(Debug)]
pub struct ProjectionWorker;

impl ProjectionWorker {
    /// Spawn a worker thread that projects records from the bus.
    ///
    /// The subscription is taken before this returns, so records published
    /// afterwards are never missed.
    pub fn spawn<S, B>(name: &'static str, bus: &B, projector: Arc<Projector<S>>) -> WorkerHandle
    where
        S: ReadStore + 'static,
        B: EventBus<EventRecord>,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let subscription = bus.subscribe();
        let progress = Arc::new(Progress {
            state: Mutex::new(ProgressState {
                applied: 0,
                stopped: false,
            }),
            changed: Condvar::new(),
        });

        let worker_progress = progress.clone();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, subscription, shutdown_rx, projector, &worker_progress))
            .expect("failed to spawn projection worker thread");

        WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            progress,
        }
    }
}

fn worker_loop<S>(
    name: &'static str,
    subscription: Subscription<EventRecord>,
    shutdown_rx: mpsc::Receiver<()>,
    projector: Arc<Projector<S>>,
    progress: &Progress,
) where
    S: ReadStore,
{
    let tick = Duration::from_millis(250);

    loop {
        // Shutdown check (non-blocking).
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match subscription.recv_timeout(tick) {
            Ok(record) => {
                if let Err(err) = projector.apply(&record) {
                    // An appended event that cannot be projected is fatal
                    // for this instance; recovery is replay from the log.
                    error!(worker = name, error = %err, "projection failed; worker stopping");
                    break;
                }
                if let Ok(mut state) = progress.state.lock() {
                    state.applied += 1;
                    progress.changed.notify_all();
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!(worker = name, "bus disconnected; worker stopping");
                break;
            }
        }
    }

    if let Ok(mut state) = progress.state.lock() {
        state.stopped = true;
        progress.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use murmur_core::{PostBody, PostId, UserId, Username};
    use murmur_events::{DomainEvent, InMemoryEventBus, PostPublished, UserRegistered};

    use crate::config::Tunables;
    use crate::event_log::{EventLog, InMemoryEventLog};
    use crate::read_store::{InMemoryReadStore, ReadStore};

    fn registered(user_id: UserId, name: &str) -> EventRecord {
        EventRecord::emit(
            user_id.into(),
            1,
            Utc::now(),
            DomainEvent::UserRegistered(UserRegistered {
                username: Username::new(name).unwrap(),
            }),
        )
    }

    fn published(post_id: PostId, author: UserId, body: &str) -> EventRecord {
        let at = Utc::now();
        EventRecord::emit(
            post_id.into(),
            1,
            at,
            DomainEvent::PostPublished(PostPublished {
                author_id: author,
                body: PostBody::new(body).unwrap(),
                published_at: at,
            }),
        )
    }

    fn setup() -> (
        Arc<InMemoryEventBus<EventRecord>>,
        Arc<Projector<InMemoryReadStore>>,
        WorkerHandle,
    ) {
        let bus = Arc::new(InMemoryEventBus::new());
        let projector = Arc::new(Projector::new(InMemoryReadStore::new(Tunables {
            celebrity_threshold: 3,
            max_timeline: 5,
        })));
        let handle = ProjectionWorker::spawn("projection-test", &bus, projector.clone());
        (bus, projector, handle)
    }

    #[test]
    fn projects_published_records_in_order() {
        let (bus, projector, handle) = setup();

        let alice = UserId::new();
        let post = PostId::new();
        bus.publish(registered(alice, "alice")).unwrap();
        let seq = bus.publish(published(post, alice, "hello")).unwrap();

        assert!(handle.wait_for(seq));
        assert_eq!(
            projector.store().profile(alice).unwrap().username.as_str(),
            "alice"
        );
        assert!(projector.store().post(post).is_some());

        handle.shutdown();
    }

    #[test]
    fn wait_for_gives_read_your_writes_through_the_log_and_bus() {
        let (bus, projector, handle) = setup();
        let log = InMemoryEventLog::new();

        // The append-then-publish path a background-mode handler runs.
        let alice = UserId::new();
        let record = registered(alice, "alice");
        log.append(record.aggregate_id(), vec![record.clone()]).unwrap();
        let seq = bus.publish(record).unwrap();

        assert!(handle.wait_for(seq));
        assert!(projector.store().profile(alice).is_some());

        handle.shutdown();
    }

    #[test]
    fn fatal_projection_failure_stops_the_worker() {
        let (bus, projector, handle) = setup();

        // A post by an unregistered author is a corrupt stream for the
        // projector.
        let seq = bus
            .publish(published(PostId::new(), UserId::new(), "ghost"))
            .unwrap();

        assert!(!handle.wait_for(seq));
        assert_eq!(handle.applied(), 0);
        assert!(projector.store().list_profiles().is_empty());

        handle.shutdown();
    }

    #[test]
    fn shutdown_wakes_waiters() {
        let (_bus, _projector, handle) = setup();

        let handle = Arc::new(handle);
        let waiter = {
            let handle = handle.clone();
            thread::spawn(move || handle.wait_for(1))
        };

        // Nothing was published; shutting down must unblock the waiter.
        let _ = handle.shutdown.send(());
        assert!(!waiter.join().unwrap());
    }
}
