//! Subscriber callback registry.
//!
//! One registry per service record. Broadcast is enqueue-only: events land
//! on each subscriber's own queue, so delivering can never re-enter the
//! broker's critical section or block on a slow subscriber.

use std::collections::HashMap;
use std::fmt;

use svclite_shared::ConnectionEvent;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of one subscriber endpoint; duplicates collapse by this id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote subscriber endpoint: an identity plus the event queue that forms
/// its delivery context.
#[derive(Clone, Debug)]
pub struct Subscriber {
    id: SubscriberId,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

impl Subscriber {
    /// Create a subscriber endpoint and the receiving half of its queue.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: SubscriberId::new(),
                events,
            },
            rx,
        )
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Enqueue one event. Fails when the receiving side is gone.
    pub(crate) fn deliver(&self, event: ConnectionEvent) -> Result<(), ()> {
        self.events.send(event).map_err(|_| ())
    }
}

/// Set of subscriber endpoints for one service record.
///
/// Set semantics, no ordering guarantee. Mutated only while the broker's
/// table lock is held.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    subscribers: HashMap<SubscriberId, Subscriber>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Idempotent: re-registering the same endpoint
    /// has no additional effect. Returns `true` if it was newly added.
    pub fn register(&mut self, subscriber: Subscriber) -> bool {
        match self.subscribers.entry(subscriber.id()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(subscriber);
                true
            }
        }
    }

    /// Remove a subscriber. Returns `true` if it was present.
    pub fn unregister(&mut self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Each delivery is isolated: an unreachable subscriber is logged and
    /// skipped, and never prevents delivery to the rest.
    pub fn broadcast(&self, event: &ConnectionEvent) {
        for subscriber in self.subscribers.values() {
            if subscriber.deliver(event.clone()).is_err() {
                tracing::warn!(
                    subscriber = %subscriber.id,
                    component = %event.component(),
                    "dropping event for unreachable subscriber"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svclite_shared::ComponentName;

    fn disconnected() -> ConnectionEvent {
        ConnectionEvent::Disconnected {
            component: ComponentName::new("com.example.app", "ExampleService"),
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = CallbackRegistry::new();
        let (subscriber, _rx) = Subscriber::channel();

        assert!(registry.register(subscriber.clone()));
        assert!(!registry.register(subscriber));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister() {
        let mut registry = CallbackRegistry::new();
        let (subscriber, _rx) = Subscriber::channel();
        let id = subscriber.id();

        registry.register(subscriber);
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_every_subscriber() {
        let mut registry = CallbackRegistry::new();
        let (a, mut rx_a) = Subscriber::channel();
        let (b, mut rx_b) = Subscriber::channel();
        registry.register(a);
        registry.register(b);

        registry.broadcast(&disconnected());

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn test_broadcast_isolates_dead_subscriber() {
        let mut registry = CallbackRegistry::new();
        let (dead, rx_dead) = Subscriber::channel();
        let (live, mut rx_live) = Subscriber::channel();
        registry.register(dead);
        registry.register(live);

        drop(rx_dead);
        registry.broadcast(&disconnected());

        assert!(rx_live.try_recv().is_ok());
    }
}
