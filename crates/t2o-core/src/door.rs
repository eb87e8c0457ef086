//! Door states exposed to the accessory framework
//!
//! Numeric values follow the HomeKit garage door characteristics so a
//! framework adapter can forward them unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current position of a gate as tracked by the local model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    Open,
    Closed,
    Opening,
    /// Never entered by the gate model; the gate is assumed to reclose on its own
    Closing,
}

impl DoorState {
    /// HomeKit `CurrentDoorState` value
    pub fn hap_value(self) -> u8 {
        match self {
            DoorState::Open => 0,
            DoorState::Closed => 1,
            DoorState::Opening => 2,
            DoorState::Closing => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DoorState::Open => "open",
            DoorState::Closed => "closed",
            DoorState::Opening => "opening",
            DoorState::Closing => "closing",
        }
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetDoorState {
    Open,
    Closed,
}

impl TargetDoorState {
    /// HomeKit `TargetDoorState` value
    pub fn hap_value(self) -> u8 {
        match self {
            TargetDoorState::Open => 0,
            TargetDoorState::Closed => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetDoorState::Open => "open",
            TargetDoorState::Closed => "closed",
        }
    }
}

impl fmt::Display for TargetDoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A characteristic value pushed to the accessory framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "characteristic", content = "value")]
pub enum CharacteristicUpdate {
    CurrentDoorState(DoorState),
    TargetDoorState(TargetDoorState),
}

impl CharacteristicUpdate {
    /// Name of the characteristic being updated
    pub fn characteristic(&self) -> &'static str {
        match self {
            CharacteristicUpdate::CurrentDoorState(_) => "CurrentDoorState",
            CharacteristicUpdate::TargetDoorState(_) => "TargetDoorState",
        }
    }

    /// HomeKit numeric value of the update
    pub fn hap_value(&self) -> u8 {
        match self {
            CharacteristicUpdate::CurrentDoorState(state) => state.hap_value(),
            CharacteristicUpdate::TargetDoorState(target) => target.hap_value(),
        }
    }
}
