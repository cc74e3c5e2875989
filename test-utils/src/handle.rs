//! Manually controllable remote handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use svclite_shared::RemoteHandle;
use tokio_util::sync::CancellationToken;

/// Remote handle whose liveness and death are driven by the test.
#[derive(Debug)]
pub struct FakeHandle {
    name: String,
    alive: AtomicBool,
    shutdown_requested: AtomicBool,
    gone: CancellationToken,
}

impl FakeHandle {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            alive: AtomicBool::new(true),
            shutdown_requested: AtomicBool::new(false),
            gone: CancellationToken::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulate process death: liveness probe fails and the death watch
    /// fires.
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.gone.cancel();
    }

    /// Flip the liveness probe only, without firing the death watch.
    /// Models a peer the probe already sees dead before any watcher does.
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteHandle for FakeHandle {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn closed(&self) {
        self.gone.cancelled().await;
    }

    async fn shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }
}
