//! Core types for the Tap2Open bridge
//!
//! This crate provides the fundamental types shared by every other crate in
//! the workspace: the remote `Gate` record, the session `Token`, the door
//! states exposed to the accessory framework, the error taxonomy of the
//! vendor API, and the injectable `Clock`.

mod accessory_key;
mod api;
mod clock;
mod door;
mod error;
mod gate;
mod token;

pub use accessory_key::AccessoryKey;
pub use api::GateApi;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use door::{CharacteristicUpdate, DoorState, TargetDoorState};
pub use error::{ApiError, ApiResult, ErrorContext};
pub use gate::{Gate, GateId, GateParameters};
pub use token::{Credentials, Token};

/// Manufacturer reported in the accessory information of every gate
pub const MANUFACTURER: &str = "Tap2Open";

/// Model reported in the accessory information of every gate
pub const MODEL: &str = "Gate";
