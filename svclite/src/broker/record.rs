//! One tracked remote-service instance.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use svclite_shared::{AttachToken, ComponentName, ConnectionEvent, RemoteHandle, ServiceKey};

use super::core::BrokerInner;
use super::options::ServiceOptions;
use super::registry::CallbackRegistry;
use crate::launcher::LaunchCommand;

/// One slot in the broker's record table.
///
/// Tracks a single requested service instance from creation through attach
/// to teardown. The handle transitions unset -> set -> torn-down, never
/// set -> unset in place: a re-spawn always goes through a fresh record
/// with a fresh token. All fields are mutated only while the broker's
/// table lock is held.
pub(crate) struct ServiceRecord {
    pub(crate) key: ServiceKey,
    pub(crate) component: ComponentName,
    pub(crate) version: u32,
    /// One-time attach credential, minted at creation.
    pub(crate) token: AttachToken,
    /// Install location of the owning package.
    pub(crate) source_dir: PathBuf,
    /// Live remote handle; absent until attach completes.
    pub(crate) handle: Option<Arc<dyn RemoteHandle>>,
    pub(crate) subscribers: CallbackRegistry,
    /// A spawn has been scheduled and neither failed nor attached yet.
    pub(crate) spawn_in_flight: bool,
    pub(crate) created_at: DateTime<Utc>,
    /// Capability to remove this record from the table.
    pub(crate) removal: RemovalHandle,
}

impl ServiceRecord {
    pub(crate) fn new(
        key: ServiceKey,
        token: AttachToken,
        options: &ServiceOptions,
        source_dir: PathBuf,
        removal: RemovalHandle,
    ) -> Self {
        Self {
            key,
            component: options.component.clone(),
            version: options.version_code,
            token,
            source_dir,
            handle: None,
            subscribers: CallbackRegistry::new(),
            spawn_in_flight: false,
            created_at: Utc::now(),
            removal,
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// The stored handle, if it is still alive.
    pub(crate) fn live_handle(&self) -> Option<Arc<dyn RemoteHandle>> {
        self.handle.as_ref().filter(|h| h.is_alive()).map(Arc::clone)
    }

    /// Build the launch command for this record. Per-request knobs
    /// (process name, debug flag, requester uid) come from the request;
    /// identity and the token come from the record.
    pub(crate) fn launch_command(
        &self,
        options: &ServiceOptions,
        requester_uid: u32,
    ) -> LaunchCommand {
        LaunchCommand {
            token: self.token.clone(),
            component: self.component.clone(),
            source_dir: self.source_dir.clone(),
            process_name_suffix: options.process_name_suffix.clone(),
            requester_uid,
            debuggable: options.debuggable,
        }
    }

    /// Broadcast `Connected` with the stored handle to all subscribers.
    pub(crate) fn broadcast_connected(&self) {
        if let Some(handle) = &self.handle {
            self.subscribers.broadcast(&ConnectionEvent::Connected {
                component: self.component.clone(),
                handle: Arc::clone(handle),
            });
        }
    }

    /// Broadcast `Disconnected` to all subscribers.
    pub(crate) fn broadcast_disconnected(&self) {
        self.subscribers.broadcast(&ConnectionEvent::Disconnected {
            component: self.component.clone(),
        });
    }

    pub(crate) fn to_info(&self) -> ServiceInfo {
        ServiceInfo {
            key: self.key.clone(),
            component: self.component.clone(),
            version: self.version,
            attached: self.is_attached(),
            spawn_in_flight: self.spawn_in_flight,
            subscriber_count: self.subscribers.len(),
            created_at: self.created_at,
        }
    }
}

/// Capability to remove one specific record from the broker table.
///
/// Bound to the record's key and token at creation, so a firing death
/// watch can never tear down a successor record that took over the key.
#[derive(Clone)]
pub struct RemovalHandle {
    key: ServiceKey,
    token: AttachToken,
    broker: Weak<BrokerInner>,
}

impl RemovalHandle {
    pub(crate) fn new(key: ServiceKey, token: AttachToken, broker: Weak<BrokerInner>) -> Self {
        Self { key, token, broker }
    }

    /// Remove the bound record if it is still the live one for its key.
    /// No-op when the broker is gone or the key now maps to a different
    /// record.
    pub(crate) fn invoke(&self) {
        if let Some(broker) = self.broker.upgrade() {
            broker.remove_if_current(&self.key, &self.token);
        }
    }
}

/// Point-in-time view of one record.
#[derive(Clone, Debug, Serialize)]
pub struct ServiceInfo {
    pub key: ServiceKey,
    pub component: ComponentName,
    pub version: u32,
    pub attached: bool,
    pub spawn_in_flight: bool,
    pub subscriber_count: usize,
    pub created_at: DateTime<Utc>,
}
