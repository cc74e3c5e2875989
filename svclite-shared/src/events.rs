//! Events and replies delivered across the broker boundary.

use crate::component::ComponentName;
use crate::handle::RemoteHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Connection transition delivered to service subscribers.
///
/// Each subscriber sees exactly one `Connected` per successful attach and
/// exactly one `Disconnected` per teardown of the record it subscribed to.
#[derive(Clone, Debug)]
pub enum ConnectionEvent {
    /// The service instance attached and is reachable.
    Connected {
        component: ComponentName,
        handle: Arc<dyn RemoteHandle>,
    },

    /// The record was removed or its process died.
    Disconnected { component: ComponentName },
}

impl ConnectionEvent {
    pub fn component(&self) -> &ComponentName {
        match self {
            ConnectionEvent::Connected { component, .. } => component,
            ConnectionEvent::Disconnected { component } => component,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionEvent::Connected { .. })
    }
}

/// Outcome of a permission request, delivered to one client session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionReply {
    #[serde(rename = "svclite:request-permission-reply-allowed")]
    pub allowed: bool,

    #[serde(rename = "svclite:request-permission-reply-is-onetime")]
    pub one_time: bool,
}

/// Reply returned when a client process attaches to the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachReply {
    #[serde(rename = "svclite:attach-reply-version")]
    pub server_version: u32,

    #[serde(rename = "svclite:attach-reply-uid")]
    pub server_uid: u32,

    #[serde(rename = "svclite:attach-reply-permission-granted")]
    pub permission_granted: bool,
}
