//! Svclite shared core - contracts common to the broker and its clients
//!
//! This crate contains the constants, error taxonomy, identity types, and
//! the remote-handle abstraction used on both sides of the broker boundary.

pub mod component;
pub mod constants;
pub mod errors;
pub mod events;
pub mod handle;
pub mod token;

pub use component::{ComponentName, ServiceKey};
pub use errors::{SvcliteError, SvcliteResult};
pub use events::{AttachReply, ConnectionEvent, PermissionReply};
pub use handle::RemoteHandle;
pub use token::AttachToken;
