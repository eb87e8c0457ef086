//! Accessory side of the Tap2Open bridge
//!
//! This crate provides the seam to the home-automation accessory framework
//! ([`AccessoryFramework`]), an in-process implementation of it
//! ([`LocalAccessories`]), and the per-gate door state machine
//! ([`GateController`]) that turns a single "open" intent into timed door
//! state transitions.

mod controller;
mod error;
mod framework;

pub use controller::{DoorTimings, GateAccessoryState, GateController};
pub use error::{AccessoryError, AccessoryResult};
pub use framework::{
    AccessoryDescriptor, AccessoryEvent, AccessoryFramework, AccessoryRecord, LocalAccessories,
    SharedFramework,
};
