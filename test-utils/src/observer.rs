//! Observer that reports callbacks into a channel the test can await.

use std::sync::Arc;

use async_trait::async_trait;
use svclite::notifier::ServiceObserver;
use svclite_shared::{ComponentName, RemoteHandle};
use tokio::sync::mpsc;

/// One observed callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Observed {
    Connected(ComponentName),
    Disconnected(ComponentName),
}

/// Local service observer that forwards every callback to the test.
pub struct RecordingObserver {
    events: mpsc::UnboundedSender<Observed>,
}

impl RecordingObserver {
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Observed>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { events }), rx)
    }
}

#[async_trait]
impl ServiceObserver for RecordingObserver {
    async fn on_connected(&self, component: &ComponentName, _handle: Arc<dyn RemoteHandle>) {
        let _ = self.events.send(Observed::Connected(component.clone()));
    }

    async fn on_disconnected(&self, component: &ComponentName) {
        let _ = self.events.send(Observed::Disconnected(component.clone()));
    }
}
