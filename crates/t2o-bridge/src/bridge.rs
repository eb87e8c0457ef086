//! The bridge facade
//!
//! Wires configuration, session client, gate catalog and supervisor
//! together and routes user get/set intents from the accessory framework to
//! the matching gate controller.

use std::sync::Arc;
use std::time::Duration;

use t2o_accessory::{
    AccessoryDescriptor, AccessoryError, AccessoryResult, DoorTimings, GateController,
    SharedFramework,
};
use t2o_client::SessionClient;
use t2o_config::BridgeConfig;
use t2o_core::{AccessoryKey, DoorState, SharedClock, SystemClock, TargetDoorState};
use tokio::sync::watch;
use tracing::{info, instrument};

use crate::catalog::GateCatalog;
use crate::supervisor::{ConnectionState, ReconnectSupervisor};

/// A configured Tap2Open bridge
pub struct Bridge {
    name: String,
    session: Arc<SessionClient>,
    catalog: Arc<GateCatalog>,
    supervisor: ReconnectSupervisor,
}

impl Bridge {
    /// Create a bridge publishing gates to `framework`
    pub fn new(config: &BridgeConfig, framework: SharedFramework) -> Self {
        Self::with_clock(config, framework, Arc::new(SystemClock))
    }

    /// Create a bridge whose timers and token expiry follow `clock`
    pub fn with_clock(config: &BridgeConfig, framework: SharedFramework, clock: SharedClock) -> Self {
        let session = Arc::new(
            SessionClient::new(&config.base_url, config.credentials.clone())
                .with_token_ttl(config.token_ttl)
                .with_clock(clock.clone()),
        );

        let timings = DoorTimings {
            opening: config.opening_delay,
            open: config.open_delay,
        };
        let catalog = Arc::new(GateCatalog::new(
            session.clone(),
            framework,
            clock.clone(),
            timings,
        ));

        let supervisor = ReconnectSupervisor::new(
            session.clone(),
            catalog.clone(),
            clock,
            config.reconnect_interval,
        );

        Self {
            name: config.name.clone(),
            session,
            catalog,
            supervisor,
        }
    }

    /// Override the lower bound applied to the reconnect interval
    pub fn with_minimum_reconnect_interval(mut self, minimum: Duration) -> Self {
        self.supervisor = self.supervisor.with_minimum_interval(minimum);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> &Arc<SessionClient> {
        &self.session
    }

    pub fn catalog(&self) -> &Arc<GateCatalog> {
        &self.catalog
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.connection_state()
    }

    /// Hand over an accessory the framework restored from its cache
    pub fn configure_cached_accessory(&self, descriptor: AccessoryDescriptor) {
        self.catalog.restore(descriptor);
    }

    /// Begin connecting and supervising the session
    pub fn start(&self) {
        info!(name = %self.name, "Starting bridge");
        self.supervisor.start();
    }

    pub fn stop(&self) {
        info!(name = %self.name, "Stopping bridge");
        self.supervisor.stop();
    }

    /// User set intent for the target door state
    #[instrument(skip(self))]
    pub async fn set_target_door_state(
        &self,
        key: &AccessoryKey,
        target: TargetDoorState,
    ) -> AccessoryResult<()> {
        self.controller(key)?.set_target_door_state(target).await
    }

    /// User get intent for the target door state
    pub fn target_door_state(&self, key: &AccessoryKey) -> AccessoryResult<TargetDoorState> {
        Ok(self.controller(key)?.target_door_state())
    }

    /// User get intent for the current door state
    pub fn current_door_state(&self, key: &AccessoryKey) -> AccessoryResult<DoorState> {
        self.controller(key)?.current_door_state()
    }

    fn controller(&self, key: &AccessoryKey) -> AccessoryResult<GateController> {
        self.catalog
            .controller(key)
            .ok_or(AccessoryError::UnknownAccessory(*key))
    }
}
