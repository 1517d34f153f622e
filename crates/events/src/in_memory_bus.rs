//! In-memory event bus for tests/dev.

use std::sync::{mpsc, Mutex};

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,
}

/// In-memory pub/sub bus.
///
/// Sequencing and fan-out happen under one lock, so every subscriber sees
/// messages in publish order and the returned sequence numbers are dense.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    inner: Mutex<Inner<M>>,
}

#[derive(Debug)]
struct Inner<M> {
    subscribers: Vec<mpsc::Sender<M>>,
    published: u64,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                subscribers: Vec::new(),
                published: 0,
            }),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<u64, Self::Error> {
        let mut inner = self.inner.lock().map_err(|_| InMemoryBusError::Poisoned)?;

        inner.published += 1;
        let seq = inner.published;

        // Drop any dead subscribers while publishing.
        inner
            .subscribers
            .retain(|tx| tx.send(message.clone()).is_ok());

        Ok(seq)
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages until the process restarts.
        if let Ok(mut inner) = self.inner.lock() {
            inner.subscribers.push(tx);
        }

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_dense_and_order_is_preserved() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        let sub = bus.subscribe();

        assert_eq!(bus.publish(10).unwrap(), 1);
        assert_eq!(bus.publish(20).unwrap(), 2);
        assert_eq!(bus.publish(30).unwrap(), 3);

        assert_eq!(sub.recv().unwrap(), 10);
        assert_eq!(sub.recv().unwrap(), 20);
        assert_eq!(sub.recv().unwrap(), 30);
    }

    #[test]
    fn late_subscribers_miss_earlier_messages() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        bus.publish(1).unwrap();

        let sub = bus.subscribe();
        bus.publish(2).unwrap();

        assert_eq!(sub.recv().unwrap(), 2);
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        drop(bus.subscribe());

        // Publishing after a subscriber is gone neither fails nor blocks.
        assert_eq!(bus.publish(1).unwrap(), 1);
    }
}
