//! Wire-level constants shared across the broker boundary.
//!
//! These must be identical on every side of the channel: broker, client
//! library, and spawned service processes.

/// Protocol version reported to attaching clients.
pub const SERVER_VERSION: u32 = 11;

/// Option-map keys for service create/remove requests and the attach
/// handshake.
pub mod service_args {
    pub const COMPONENT: &str = "svclite:user-service-arg-component";
    pub const TAG: &str = "svclite:user-service-arg-tag";
    pub const VERSION_CODE: &str = "svclite:user-service-arg-version-code";
    pub const PROCESS_NAME: &str = "svclite:user-service-arg-process-name";
    pub const DEBUGGABLE: &str = "svclite:user-service-arg-debuggable";
    pub const TOKEN: &str = "svclite:user-service-arg-token";
}

/// Reply keys for the client-attach handshake.
pub mod attach_reply {
    pub const SERVER_VERSION: &str = "svclite:attach-reply-version";
    pub const SERVER_UID: &str = "svclite:attach-reply-uid";
    pub const PERMISSION_GRANTED: &str = "svclite:attach-reply-permission-granted";
}

/// Reply keys for permission-request results.
pub mod permission_reply {
    pub const ALLOWED: &str = "svclite:request-permission-reply-allowed";
    pub const IS_ONETIME: &str = "svclite:request-permission-reply-is-onetime";
}

/// Integer status codes returned across the channel.
pub mod status {
    /// Request accepted (record reused or spawn scheduled) or removal done.
    pub const OK: i32 = 0;

    /// Removal target did not exist.
    pub const NOT_FOUND: i32 = 1;
}
