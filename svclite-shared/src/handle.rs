//! Remote service handle abstraction.
//!
//! The message channel that carries requests and callbacks between
//! processes is supplied by the embedder. The lifecycle protocol only needs
//! a liveness probe and a one-shot death notification, so that is the whole
//! contract here.

use async_trait::async_trait;
use std::fmt;

/// Live reference to a remote service instance.
///
/// Implementations are expected to be cheap to clone behind an `Arc` and
/// safe to probe concurrently.
#[async_trait]
pub trait RemoteHandle: fmt::Debug + Send + Sync {
    /// Cheap liveness probe (the equivalent of pinging the peer).
    fn is_alive(&self) -> bool;

    /// Resolves when the peer is observed gone.
    ///
    /// Safe to await from multiple watchers; resolves at most once per
    /// handle lifetime (a dead handle stays dead). Never resolves while
    /// the peer is reachable.
    async fn closed(&self);

    /// Ask the remote service to exit. Best-effort; default is a no-op.
    async fn shutdown(&self) {}
}
