//! Client-side connection notifier.
//!
//! Consumes a subscriber's event queue on one ordered relay task and fans
//! transitions out to local observers. Each received handle gets its own
//! death watch; protocol-level disconnects and death-watch firings are
//! reconciled so observers see every transition exactly once per handle
//! lifetime.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use svclite_shared::{ComponentName, ConnectionEvent, RemoteHandle};
use tokio::sync::mpsc;

use crate::broker::Subscriber;

/// Local observer of one target service's connection state.
#[async_trait]
pub trait ServiceObserver: Send + Sync {
    async fn on_connected(&self, component: &ComponentName, handle: Arc<dyn RemoteHandle>);

    async fn on_disconnected(&self, component: &ComponentName);
}

/// Relays connect/disconnect transitions for one target identity onto
/// local observers.
///
/// Delivery happens on a single internal task, so observer callbacks for
/// one notifier are never concurrent and arrive in a well-defined order.
#[derive(Clone)]
pub struct ConnectionNotifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    component: ComponentName,
    observers: Mutex<Vec<Arc<dyn ServiceObserver>>>,
    link: Mutex<Link>,
}

/// Tracks the current handle generation and whether its disconnect has
/// already been delivered.
#[derive(Default)]
struct Link {
    generation: u64,
    dead: bool,
}

impl ConnectionNotifier {
    /// Create a notifier for `component` and the subscriber endpoint to
    /// hand to the broker.
    ///
    /// Must be called within a tokio runtime; the relay task owns the
    /// receiving half of the subscriber queue and exits when the broker
    /// side drops it.
    pub fn new(component: ComponentName) -> (Self, Subscriber) {
        let (subscriber, events) = Subscriber::channel();
        let inner = Arc::new(NotifierInner {
            component,
            observers: Mutex::new(Vec::new()),
            link: Mutex::new(Link::default()),
        });

        tokio::spawn(run_relay(Arc::clone(&inner), events));

        (Self { inner }, subscriber)
    }

    pub fn component(&self) -> &ComponentName {
        &self.inner.component
    }

    /// Add a local observer. Idempotent for the same `Arc`.
    pub fn add_observer(&self, observer: Arc<dyn ServiceObserver>) {
        let mut observers = self.inner.lock_observers();
        if !observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            observers.push(observer);
        }
    }

    /// Remove a local observer. Returns `true` if it was registered.
    pub fn remove_observer(&self, observer: &Arc<dyn ServiceObserver>) -> bool {
        let mut observers = self.inner.lock_observers();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        observers.len() != before
    }
}

/// The notifier's single delivery context: one queue, one consumer.
async fn run_relay(
    inner: Arc<NotifierInner>,
    mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
) {
    // Death watches report into the same consumer so observer callbacks
    // stay serialized.
    let (death_tx, mut deaths) = mpsc::unbounded_channel::<u64>();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    ConnectionEvent::Connected { handle, .. } => {
                        let generation = inner.begin_link();

                        let watch_handle = Arc::clone(&handle);
                        let watch_tx = death_tx.clone();
                        tokio::spawn(async move {
                            watch_handle.closed().await;
                            let _ = watch_tx.send(generation);
                        });

                        inner.deliver_connected(handle).await;
                    }
                    ConnectionEvent::Disconnected { .. } => {
                        let generation = inner.current_generation();
                        inner.deliver_disconnected(generation).await;
                    }
                }
            }
            death = deaths.recv() => {
                // The relay keeps a sender alive, so this arm only ever
                // sees real death notifications.
                if let Some(generation) = death {
                    inner.deliver_disconnected(generation).await;
                }
            }
        }
    }
}

impl NotifierInner {
    fn lock_observers(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn ServiceObserver>>> {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_link(&self) -> std::sync::MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers_snapshot(&self) -> Vec<Arc<dyn ServiceObserver>> {
        self.lock_observers().clone()
    }

    /// Start a new handle generation; resets the disconnect latch.
    fn begin_link(&self) -> u64 {
        let mut link = self.lock_link();
        link.generation += 1;
        link.dead = false;
        link.generation
    }

    fn current_generation(&self) -> u64 {
        self.lock_link().generation
    }

    async fn deliver_connected(&self, handle: Arc<dyn RemoteHandle>) {
        for observer in self.observers_snapshot() {
            observer
                .on_connected(&self.component, Arc::clone(&handle))
                .await;
        }
    }

    /// Deliver a disconnect for `generation` at most once. A firing death
    /// watch after an explicit disconnect (or vice versa) is ignored.
    async fn deliver_disconnected(&self, generation: u64) {
        {
            let mut link = self.lock_link();
            if link.generation != generation || link.dead {
                return;
            }
            link.dead = true;
        }

        tracing::debug!(component = %self.component, "service disconnected");
        for observer in self.observers_snapshot() {
            observer.on_disconnected(&self.component).await;
        }
    }
}
