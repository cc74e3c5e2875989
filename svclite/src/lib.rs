//! Svclite - privileged remote-service lifecycle broker.
//!
//! Unprivileged clients ask the broker for on-demand, named service
//! instances. The broker deduplicates concurrent requests per service key,
//! spawns the service process through an injected launcher, binds the
//! process back to its record via a one-time attach token, and fans
//! connect/disconnect transitions out to every subscriber with death
//! detection on the live handle.
//!
//! # Overview
//!
//! - [`broker::ServiceBroker`]: the record table and lifecycle state machine
//! - [`launcher::ProcessLauncher`]: injected process-spawn collaborator
//! - [`pkg::PackageResolver`]: injected package identity lookup
//! - [`notifier::ConnectionNotifier`]: client-side observer relay
//! - [`session::SessionManager`]: attached clients and result delivery

pub mod broker;
pub mod launcher;
pub mod notifier;
pub mod pkg;
pub mod remote;
pub mod session;
pub mod util;

mod logging;

pub use broker::{
    BrokerOptions, Caller, RemoveStatus, RequestStatus, ServiceBroker, ServiceInfo,
    ServiceOptions, Subscriber,
};
pub use logging::init_logging;
pub use notifier::{ConnectionNotifier, ServiceObserver};
pub use svclite_shared::{
    AttachToken, ComponentName, ConnectionEvent, RemoteHandle, ServiceKey, SvcliteError,
    SvcliteResult,
};
