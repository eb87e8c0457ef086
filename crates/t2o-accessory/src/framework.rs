//! The accessory framework seam
//!
//! The bridge calls into the framework to register accessories and to push
//! software-driven state changes; the framework calls back into gate
//! controllers for user get/set intents. [`LocalAccessories`] is an
//! in-process implementation that keeps the last pushed values and
//! broadcasts every change to subscribers.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use t2o_core::{
    AccessoryKey, CharacteristicUpdate, DoorState, Gate, TargetDoorState, MANUFACTURER, MODEL,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Default channel capacity for accessory event subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Everything the framework needs to register a gate accessory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryDescriptor {
    pub key: AccessoryKey,
    pub display_name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    /// Gate snapshot the accessory was created from
    pub gate: Gate,
}

impl AccessoryDescriptor {
    /// Descriptor for the accessory representing `gate`
    pub fn for_gate(gate: &Gate) -> Self {
        Self {
            key: AccessoryKey::for_gate(gate.gate_id),
            display_name: gate.description(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
            serial_number: gate.gate_id.to_string(),
            gate: gate.clone(),
        }
    }
}

/// Operations the bridge performs on the accessory framework
pub trait AccessoryFramework: Send + Sync {
    /// Register a newly discovered accessory
    fn register_accessory(&self, descriptor: AccessoryDescriptor);

    /// Push a characteristic value the framework cannot learn otherwise
    fn update_state(&self, key: &AccessoryKey, update: CharacteristicUpdate);
}

/// Thread-safe wrapper for an AccessoryFramework
pub type SharedFramework = Arc<dyn AccessoryFramework>;

/// Change notifications broadcast by [`LocalAccessories`]
#[derive(Debug, Clone, PartialEq)]
pub enum AccessoryEvent {
    Registered(AccessoryDescriptor),
    StateUpdated {
        key: AccessoryKey,
        update: CharacteristicUpdate,
    },
}

/// An accessory as last seen by the framework
#[derive(Debug, Clone, PartialEq)]
pub struct AccessoryRecord {
    pub descriptor: AccessoryDescriptor,
    pub current_door_state: Option<DoorState>,
    pub target_door_state: Option<TargetDoorState>,
}

/// In-process accessory framework
pub struct LocalAccessories {
    accessories: DashMap<AccessoryKey, AccessoryRecord>,
    sender: broadcast::Sender<AccessoryEvent>,
}

impl LocalAccessories {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create with the given event channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            accessories: DashMap::new(),
            sender,
        }
    }

    /// Receive every registration and state update from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AccessoryEvent> {
        self.sender.subscribe()
    }

    pub fn get(&self, key: &AccessoryKey) -> Option<AccessoryRecord> {
        self.accessories.get(key).map(|r| r.clone())
    }

    /// All registered accessories, ordered by display name
    pub fn all(&self) -> Vec<AccessoryRecord> {
        let mut records: Vec<AccessoryRecord> =
            self.accessories.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.descriptor.display_name.cmp(&b.descriptor.display_name));
        records
    }

    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    fn emit(&self, event: AccessoryEvent) {
        // Ignore send errors - they just mean no active receivers
        let _ = self.sender.send(event);
    }
}

impl Default for LocalAccessories {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessoryFramework for LocalAccessories {
    fn register_accessory(&self, descriptor: AccessoryDescriptor) {
        info!(
            key = %descriptor.key,
            name = %descriptor.display_name,
            "Registering accessory"
        );

        self.accessories.insert(
            descriptor.key,
            AccessoryRecord {
                descriptor: descriptor.clone(),
                current_door_state: None,
                target_door_state: None,
            },
        );
        self.emit(AccessoryEvent::Registered(descriptor));
    }

    fn update_state(&self, key: &AccessoryKey, update: CharacteristicUpdate) {
        let Some(mut record) = self.accessories.get_mut(key) else {
            warn!(key = %key, "State update for unregistered accessory");
            return;
        };

        match update {
            CharacteristicUpdate::CurrentDoorState(state) => {
                record.current_door_state = Some(state)
            }
            CharacteristicUpdate::TargetDoorState(target) => {
                record.target_door_state = Some(target)
            }
        }
        drop(record);

        debug!(
            key = %key,
            characteristic = update.characteristic(),
            value = update.hap_value(),
            "Updated characteristic"
        );
        self.emit(AccessoryEvent::StateUpdated { key: *key, update });
    }
}
