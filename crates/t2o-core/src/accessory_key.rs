//! Stable accessory identity derived from a gate id

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::GateId;

/// Namespace for gate accessory UUIDs
const GATE_NAMESPACE: Uuid = Uuid::from_u128(0x6d1f_4c1e_8a7b_4f52_9c3e_2b0a_7d5e_1f84);

/// Key under which a gate is registered with the accessory framework
///
/// Derived deterministically from the gate id so that accessories restored
/// from a framework cache map back onto the same gate after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessoryKey(Uuid);

impl AccessoryKey {
    /// Key for the accessory that represents `gate_id`
    pub fn for_gate(gate_id: GateId) -> Self {
        Self(Uuid::new_v5(&GATE_NAMESPACE, gate_id.to_string().as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AccessoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
