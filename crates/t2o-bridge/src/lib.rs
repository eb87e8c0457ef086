//! Tap2Open bridge
//!
//! Connects the vendor session client to the accessory framework:
//! [`GateCatalog`] turns the remote gate listing into gate controllers,
//! [`ReconnectSupervisor`] restarts the session after any failure, and
//! [`Bridge`] ties both to a [`t2o_config::BridgeConfig`].

mod bridge;
mod catalog;
mod supervisor;

pub use bridge::Bridge;
pub use catalog::{DiscoveryReport, GateCatalog};
pub use supervisor::{ConnectionState, ReconnectSupervisor, MINIMUM_RECONNECT_INTERVAL};
