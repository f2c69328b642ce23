//! Input hub: the single dispatch point raw samples flow through.
//!
//! Producers (a host event loop, a recording replay, a stdin reader) call
//! [`InputHub::dispatch`], or [`InputHub::dispatch_blocking`] when they must
//! wait for queue space instead of dropping; consumers hold a
//! [`Subscription`] and drain it.
//! Dropping a subscription removes it from the hub, so a consumer that is
//! torn down never leaves a dangling listener behind.

use crate::collector::types::RawSample;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

struct Subscriber {
    id: u64,
    sender: Sender<RawSample>,
}

struct HubInner {
    capacity: usize,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl HubInner {
    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        // A panic while holding the lock cannot leave the list half-updated.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fan-out point for raw samples. Cheap to clone; clones share subscribers.
#[derive(Clone)]
pub struct InputHub {
    inner: Arc<HubInner>,
}

impl InputHub {
    /// Create a hub whose subscriptions buffer up to `capacity` samples each.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                capacity: capacity.max(1),
                next_id: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a new listener.
    pub fn subscribe(&self) -> Subscription {
        // Use a bounded channel to prevent unbounded memory growth
        let (sender, receiver) = bounded(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers().push(Subscriber { id, sender });
        tracing::debug!(subscription = id, "input subscription added");

        Subscription {
            id,
            receiver,
            hub: Arc::clone(&self.inner),
        }
    }

    /// Deliver a sample to every live subscriber.
    ///
    /// Returns the number of subscribers that accepted it.
    pub fn dispatch(&self, sample: RawSample) -> usize {
        let mut delivered = 0;
        let mut subscribers = self.inner.subscribers();

        subscribers.retain(|sub| match sub.sender.try_send(sample.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(subscription = sub.id, "subscriber queue full, dropping sample");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });

        delivered
    }

    /// Deliver a sample to every live subscriber, waiting while a queue is full.
    ///
    /// The subscriber list is not locked while waiting, so a consumer can
    /// still unsubscribe; its pending send then fails and it is removed.
    pub fn dispatch_blocking(&self, sample: RawSample) -> usize {
        let targets: Vec<(u64, Sender<RawSample>)> = self
            .inner
            .subscribers()
            .iter()
            .map(|sub| (sub.id, sub.sender.clone()))
            .collect();

        let mut delivered = 0;
        let mut disconnected = Vec::new();
        for (id, sender) in targets {
            match sender.send(sample.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => disconnected.push(id),
            }
        }

        if !disconnected.is_empty() {
            self.inner
                .subscribers()
                .retain(|sub| !disconnected.contains(&sub.id));
        }
        delivered
    }

    /// Number of currently registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }
}

impl Default for InputHub {
    fn default() -> Self {
        Self::new(10_000)
    }
}

/// A live registration on an [`InputHub`]. Unsubscribes on drop.
pub struct Subscription {
    id: u64,
    receiver: Receiver<RawSample>,
    hub: Arc<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Try to receive a sample without blocking.
    pub fn try_recv(&self) -> Option<RawSample> {
        self.receiver.try_recv().ok()
    }

    /// Get the receiver for raw samples.
    pub fn receiver(&self) -> &Receiver<RawSample> {
        &self.receiver
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.subscribers().retain(|sub| sub.id != self.id);
        tracing::debug!(subscription = self.id, "input subscription removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::KeySample;

    fn key(ts: f64) -> RawSample {
        RawSample::Key(KeySample::down("a", ts))
    }

    #[test]
    fn test_dispatch_without_subscribers() {
        let hub = InputHub::new(4);
        assert_eq!(hub.dispatch(key(0.0)), 0);
    }

    #[test]
    fn test_fan_out() {
        let hub = InputHub::new(4);
        let a = hub.subscribe();
        let b = hub.subscribe();

        assert_eq!(hub.dispatch(key(1.0)), 2);
        assert_eq!(a.try_recv(), Some(key(1.0)));
        assert_eq!(b.try_recv(), Some(key(1.0)));
        assert_eq!(a.try_recv(), None);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = InputHub::new(4);
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);

        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.dispatch(key(2.0)), 0);
    }

    #[test]
    fn test_full_queue_drops_sample() {
        let hub = InputHub::new(1);
        let sub = hub.subscribe();

        assert_eq!(hub.dispatch(key(1.0)), 1);
        assert_eq!(hub.dispatch(key(2.0)), 0);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(sub.try_recv(), Some(key(1.0)));
    }

    #[test]
    fn test_blocking_dispatch_waits_for_space() {
        let hub = InputHub::new(2);
        let sub = hub.subscribe();

        let producer = {
            let hub = hub.clone();
            std::thread::spawn(move || {
                (0..50)
                    .map(|i| hub.dispatch_blocking(key(i as f64)))
                    .sum::<usize>()
            })
        };

        let received: Vec<RawSample> = sub.receiver().iter().take(50).collect();
        assert_eq!(producer.join().unwrap(), 50);
        assert_eq!(received.len(), 50);
        assert_eq!(received[49], key(49.0));
    }

    #[test]
    fn test_blocking_dispatch_released_by_unsubscribe() {
        let hub = InputHub::new(1);
        let sub = hub.subscribe();
        assert_eq!(hub.dispatch_blocking(key(0.0)), 1);

        let producer = {
            let hub = hub.clone();
            std::thread::spawn(move || hub.dispatch_blocking(key(1.0)))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        drop(sub);

        assert_eq!(producer.join().unwrap(), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
