//! Attached client sessions and result delivery.
//!
//! A session exists per attached client process, independent of any
//! service record. Its only asynchronous duty is delivering one-shot
//! results (permission decisions) back to the client; delivery is
//! best-effort because the decision already took effect server-side
//! whether or not the client is alive to hear about it.

use std::collections::HashMap;
use std::sync::Mutex;

use svclite_shared::constants::SERVER_VERSION;
use svclite_shared::{AttachReply, PermissionReply, SvcliteError, SvcliteResult};
use tokio::sync::mpsc;

/// One delivered result: which request it answers and the outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResultEvent {
    pub request_code: i32,
    pub reply: PermissionReply,
}

/// One attached client of the broker.
#[derive(Clone, Debug)]
pub struct ClientSession {
    pub uid: u32,
    pub pid: u32,
    pub package_name: String,
    /// Whether the client currently holds the broker permission.
    pub allowed: bool,
    results: mpsc::UnboundedSender<ResultEvent>,
}

impl ClientSession {
    pub fn new(
        uid: u32,
        pid: u32,
        package_name: impl Into<String>,
        results: mpsc::UnboundedSender<ResultEvent>,
    ) -> Self {
        Self {
            uid,
            pid,
            package_name: package_name.into(),
            allowed: false,
            results,
        }
    }

    /// Best-effort delivery of a permission decision.
    ///
    /// A broken channel (client process gone) is logged and swallowed.
    pub fn dispatch_result(&self, request_code: i32, reply: PermissionReply) {
        let event = ResultEvent {
            request_code,
            reply,
        };
        if self.results.send(event).is_err() {
            tracing::warn!(
                uid = self.uid,
                pid = self.pid,
                package = %self.package_name,
                request_code,
                "dispatch_result failed for client"
            );
        }
    }
}

/// Registry of attached clients keyed by (uid, pid).
pub struct SessionManager {
    server_uid: u32,
    sessions: Mutex<HashMap<(u32, u32), ClientSession>>,
}

impl SessionManager {
    /// Create a manager reporting `server_uid` in attach replies.
    pub fn new(server_uid: u32) -> Self {
        Self {
            server_uid,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock_sessions(
        &self,
    ) -> SvcliteResult<std::sync::MutexGuard<'_, HashMap<(u32, u32), ClientSession>>> {
        self.sessions
            .lock()
            .map_err(|e| SvcliteError::Internal(format!("session table lock poisoned: {}", e)))
    }

    /// Register an attaching client and build its attach reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the (uid, pid) pair is already attached.
    pub fn attach_client(&self, session: ClientSession) -> SvcliteResult<AttachReply> {
        let mut sessions = self.lock_sessions()?;
        let slot = (session.uid, session.pid);

        if sessions.contains_key(&slot) {
            return Err(SvcliteError::Internal(format!(
                "client (uid={}, pid={}) already attached",
                session.uid, session.pid
            )));
        }

        tracing::debug!(
            uid = session.uid,
            pid = session.pid,
            package = %session.package_name,
            "client attached"
        );

        let reply = AttachReply {
            server_version: SERVER_VERSION,
            server_uid: self.server_uid,
            permission_granted: session.allowed,
        };
        sessions.insert(slot, session);
        Ok(reply)
    }

    /// Snapshot of one session, if present.
    pub fn find(&self, uid: u32, pid: u32) -> SvcliteResult<Option<ClientSession>> {
        Ok(self.lock_sessions()?.get(&(uid, pid)).cloned())
    }

    /// Update a session's permission grant.
    ///
    /// # Errors
    ///
    /// Returns an error if the session does not exist.
    pub fn set_allowed(&self, uid: u32, pid: u32, allowed: bool) -> SvcliteResult<()> {
        let mut sessions = self.lock_sessions()?;
        match sessions.get_mut(&(uid, pid)) {
            Some(session) => {
                session.allowed = allowed;
                Ok(())
            }
            None => Err(SvcliteError::Internal(format!(
                "client (uid={}, pid={}) not attached",
                uid, pid
            ))),
        }
    }

    /// Drop a disconnected client. Returns `true` if it was attached.
    pub fn detach_client(&self, uid: u32, pid: u32) -> SvcliteResult<bool> {
        let removed = self.lock_sessions()?.remove(&(uid, pid)).is_some();
        if removed {
            tracing::debug!(uid, pid, "client detached");
        }
        Ok(removed)
    }

    /// Deliver a permission decision to one specific client. Returns
    /// `false` when no such session exists; delivery failures to a live
    /// session are swallowed by the session itself.
    pub fn dispatch_result(
        &self,
        uid: u32,
        pid: u32,
        request_code: i32,
        reply: PermissionReply,
    ) -> SvcliteResult<bool> {
        match self.find(uid, pid)? {
            Some(session) => {
                session.dispatch_result(request_code, reply);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn count(&self) -> SvcliteResult<usize> {
        Ok(self.lock_sessions()?.len())
    }
}
