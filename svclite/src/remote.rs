//! PID-backed remote handle.
//!
//! The production handle for a service process the broker can observe only
//! through its PID. Liveness is a `kill(pid, 0)` probe; death detection is
//! a background watcher that trips a cancellation token once the process
//! disappears.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use svclite_shared::{RemoteHandle, SvcliteError, SvcliteResult};
use tokio_util::sync::CancellationToken;

use crate::util::process;

/// How often the watcher probes the service PID.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Remote handle backed by an OS process id.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    gone: CancellationToken,
}

impl ProcessHandle {
    /// Adopt a service process by PID and start its death watcher.
    ///
    /// Must be called within a tokio runtime.
    pub fn adopt(pid: u32) -> Arc<Self> {
        Self::adopt_with_interval(pid, DEFAULT_POLL_INTERVAL)
    }

    /// Adopt a service process, verifying first that the PID still carries
    /// the expected command-line marker (the attach token). Rejects
    /// recycled PIDs.
    pub fn adopt_checked(pid: u32, marker: &str) -> SvcliteResult<Arc<Self>> {
        if !process::is_same_process(pid, marker) {
            return Err(SvcliteError::Internal(format!(
                "pid {} is not the expected service process",
                pid
            )));
        }
        Ok(Self::adopt(pid))
    }

    pub fn adopt_with_interval(pid: u32, poll_interval: Duration) -> Arc<Self> {
        let handle = Arc::new(Self {
            pid,
            gone: CancellationToken::new(),
        });

        let watcher = Arc::clone(&handle);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                ticker.tick().await;
                if !process::is_process_alive(watcher.pid) {
                    tracing::debug!(pid = watcher.pid, "service process is gone");
                    watcher.gone.cancel();
                    break;
                }
            }
        });

        handle
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

#[async_trait]
impl RemoteHandle for ProcessHandle {
    fn is_alive(&self) -> bool {
        !self.gone.is_cancelled() && process::is_process_alive(self.pid)
    }

    async fn closed(&self) {
        self.gone.cancelled().await;
    }

    async fn shutdown(&self) {
        if !process::terminate_process(self.pid) {
            tracing::warn!(pid = self.pid, "failed to signal service process");
        }
    }
}
