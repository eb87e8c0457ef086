//! Reconnect supervisor
//!
//! Drives the whole bridge through
//! `Disconnected -> Connecting -> Connected -> (error) -> Disconnected`.
//! While connected it is the session client's only error subscriber; the
//! first error event tears the session down, marks every gate offline and
//! schedules a fresh login and discovery. Attempts repeat for as long as the
//! supervisor runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use t2o_client::{ErrorReceiver, SessionClient};
use t2o_core::SharedClock;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

use crate::catalog::GateCatalog;

/// Reconnect delays below this are raised to it
pub const MINIMUM_RECONNECT_INTERVAL: Duration = Duration::from_secs(30);

/// Connection state of the bridge as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Keeps the session and gate catalog alive
pub struct ReconnectSupervisor {
    session: Arc<SessionClient>,
    catalog: Arc<GateCatalog>,
    clock: SharedClock,
    /// Requested delay between attempts, before clamping
    reconnect_interval: Duration,
    minimum_interval: Duration,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,
}

impl ReconnectSupervisor {
    pub fn new(
        session: Arc<SessionClient>,
        catalog: Arc<GateCatalog>,
        clock: SharedClock,
        reconnect_interval: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            session,
            catalog,
            clock,
            reconnect_interval,
            minimum_interval: MINIMUM_RECONNECT_INTERVAL,
            state_tx: Arc::new(state_tx),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Override the lower bound applied to the reconnect interval
    pub fn with_minimum_interval(mut self, minimum_interval: Duration) -> Self {
        self.minimum_interval = minimum_interval;
        self
    }

    /// The delay actually waited between attempts
    pub fn reconnect_delay(&self) -> Duration {
        clamp_delay(self.reconnect_interval, self.minimum_interval)
    }

    /// Watch connection state changes
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Start supervising in a background task
    ///
    /// The first connection attempt is made immediately.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Reconnect supervisor already running");
            return;
        }

        let delay = self.reconnect_delay();
        if delay > self.reconnect_interval {
            warn!(
                requested_secs = self.reconnect_interval.as_secs(),
                delay_secs = delay.as_secs(),
                "Reconnect interval below minimum, clamping"
            );
        }
        info!(delay_secs = delay.as_secs(), "Starting reconnect supervisor");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let session = self.session.clone();
        let catalog = self.catalog.clone();
        let clock = self.clock.clone();
        let state_tx = self.state_tx.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            loop {
                let connected = tokio::select! {
                    errors = Self::connect(&session, &catalog, &state_tx) => errors,
                    _ = shutdown_rx.recv() => break,
                };

                if let Some(mut errors) = connected {
                    tokio::select! {
                        event = errors.recv() => {
                            match event {
                                Some(e) => warn!(error = %e, "Session failed, reconnecting"),
                                None => warn!("Error channel closed, reconnecting"),
                            }
                        }
                        _ = shutdown_rx.recv() => break,
                    }
                    Self::disconnect(&session, &catalog, &state_tx).await;
                }

                info!(delay_secs = delay.as_secs(), "Scheduling reconnect");
                tokio::select! {
                    _ = clock.sleep(delay) => {}
                    _ = shutdown_rx.recv() => break,
                }
            }

            session.unsubscribe().await;
            state_tx.send_replace(ConnectionState::Disconnected);
            running.store(false, Ordering::SeqCst);
            info!("Reconnect supervisor stopped");
        });
    }

    /// Stop the supervisor; pending delays are abandoned
    pub fn stop(&self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        info!("Stopping reconnect supervisor");
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Log in afresh and rediscover; returns the error subscription on success
    async fn connect(
        session: &SessionClient,
        catalog: &GateCatalog,
        state_tx: &watch::Sender<ConnectionState>,
    ) -> Option<ErrorReceiver> {
        state_tx.send_replace(ConnectionState::Connecting);
        session.logout().await;

        // Subscribed before listing so a gate failing while discovery is in
        // flight still ends up in the channel
        let errors = session.subscribe().await;

        match catalog.discover().await {
            Ok(report) => {
                state_tx.send_replace(ConnectionState::Connected);
                info!(gates = report.total(), "Connected");
                Some(errors)
            }
            Err(e) => {
                error!(error = %e, "Failed to discover gates");
                // The failure itself is already buffered; drop it with the receiver
                session.unsubscribe().await;
                state_tx.send_replace(ConnectionState::Disconnected);
                None
            }
        }
    }

    async fn disconnect(
        session: &SessionClient,
        catalog: &GateCatalog,
        state_tx: &watch::Sender<ConnectionState>,
    ) {
        session.unsubscribe().await;
        session.logout().await;
        catalog.mark_all_offline();
        state_tx.send_replace(ConnectionState::Disconnected);
    }
}

fn clamp_delay(requested: Duration, minimum: Duration) -> Duration {
    requested.max(minimum)
}
