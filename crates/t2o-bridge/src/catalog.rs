//! Gate discovery
//!
//! The catalog owns one [`GateController`] per gate, keyed by accessory key.
//! Controllers survive across discovery cycles: a gate seen again is only
//! marked online, so a door mid-transition keeps its state.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use t2o_accessory::{AccessoryDescriptor, DoorTimings, GateController, SharedFramework};
use t2o_core::{AccessoryKey, ApiResult, Gate, GateApi, SharedClock};
use tracing::{debug, info, instrument, warn};

/// Outcome of one discovery cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Gates seen for the first time and registered with the framework
    pub added: Vec<AccessoryKey>,
    /// Gates already tracked and brought back online
    pub refreshed: Vec<AccessoryKey>,
}

impl DiscoveryReport {
    pub fn total(&self) -> usize {
        self.added.len() + self.refreshed.len()
    }
}

/// Registry of gate controllers fed by the remote gate listing
pub struct GateCatalog {
    api: Arc<dyn GateApi>,
    framework: SharedFramework,
    clock: SharedClock,
    timings: DoorTimings,
    controllers: DashMap<AccessoryKey, GateController>,
}

impl GateCatalog {
    pub fn new(
        api: Arc<dyn GateApi>,
        framework: SharedFramework,
        clock: SharedClock,
        timings: DoorTimings,
    ) -> Self {
        Self {
            api,
            framework,
            clock,
            timings,
            controllers: DashMap::new(),
        }
    }

    /// Fetch the gate listing and reconcile it with the tracked controllers
    ///
    /// A failed listing is returned untouched and nothing is registered.
    /// Gates missing from the listing are left as they are.
    #[instrument(skip(self))]
    pub async fn discover(&self) -> ApiResult<DiscoveryReport> {
        let gates = self.api.list_gates().await?;

        let mut report = DiscoveryReport::default();
        for gate in gates {
            let key = AccessoryKey::for_gate(gate.gate_id);

            let registered = match self.controllers.entry(key) {
                Entry::Occupied(entry) => {
                    debug!(gate_id = gate.gate_id, "Restoring known gate");
                    entry.get().set_online(true);
                    report.refreshed.push(key);
                    None
                }
                Entry::Vacant(entry) => {
                    let descriptor = AccessoryDescriptor::for_gate(&gate);
                    entry.insert(self.controller_for(gate, true));
                    report.added.push(key);
                    Some(descriptor)
                }
            };

            if let Some(descriptor) = registered {
                info!(
                    gate_id = %descriptor.serial_number,
                    name = %descriptor.display_name,
                    "Adding new gate"
                );
                self.framework.register_accessory(descriptor);
            }
        }

        info!(
            added = report.added.len(),
            refreshed = report.refreshed.len(),
            "Discovered gates"
        );
        Ok(report)
    }

    /// Track an accessory the framework restored from its cache
    ///
    /// The gate stays offline until a listing confirms it. Returns false if
    /// the descriptor was ignored.
    pub fn restore(&self, descriptor: AccessoryDescriptor) -> bool {
        let key = AccessoryKey::for_gate(descriptor.gate.gate_id);
        if key != descriptor.key {
            warn!(
                key = %descriptor.key,
                gate_id = descriptor.gate.gate_id,
                "Cached accessory key does not match its gate, ignoring"
            );
            return false;
        }

        match self.controllers.entry(key) {
            Entry::Occupied(_) => {
                debug!(key = %key, "Cached accessory already tracked");
                false
            }
            Entry::Vacant(entry) => {
                info!(name = %descriptor.display_name, "Loading accessory from cache");
                entry.insert(self.controller_for(descriptor.gate, false));
                true
            }
        }
    }

    /// Mark every tracked gate offline
    pub fn mark_all_offline(&self) {
        for controller in self.controllers.iter() {
            controller.set_online(false);
        }
    }

    pub fn controller(&self, key: &AccessoryKey) -> Option<GateController> {
        self.controllers.get(key).map(|c| c.clone())
    }

    /// All tracked controllers, ordered by gate id
    pub fn controllers(&self) -> Vec<GateController> {
        let mut controllers: Vec<GateController> =
            self.controllers.iter().map(|c| c.value().clone()).collect();
        controllers.sort_by_key(|c| c.gate().gate_id);
        controllers
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    fn controller_for(&self, gate: Gate, online: bool) -> GateController {
        GateController::new(
            gate,
            self.api.clone(),
            self.framework.clone(),
            self.clock.clone(),
            self.timings,
            online,
        )
    }
}
