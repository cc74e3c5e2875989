//! Remote-service lifecycle management.
//!
//! # Overview
//!
//! - **ServiceBroker**: record table, request dedup, spawn scheduling,
//!   attach handshake, death-driven cleanup
//! - **ServiceRecord**: one slot per requested service instance
//! - **CallbackRegistry**: per-record subscriber set with isolated fan-out
//! - **ServiceOptions / BrokerOptions**: request parameters and broker
//!   configuration

mod core;
pub mod options;
pub mod record;
pub mod registry;

pub use core::{Caller, RemoveStatus, RequestStatus, ServiceBroker};
pub use options::{BrokerOptions, RecordHook, ServiceOptions};
pub use record::{RemovalHandle, ServiceInfo};
pub use registry::{CallbackRegistry, Subscriber, SubscriberId};
