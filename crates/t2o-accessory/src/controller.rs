//! Per-gate door state machine
//!
//! The vendor API can only trigger an open pulse and cannot report where a
//! gate actually is, so the position is modeled locally:
//!
//! ```text
//! Closed --(open request)--> Opening --(opening delay)--> Open --(open delay)--> Closed
//!                              |
//!                              +--(remote open fails)--> Closed, offline
//! ```
//!
//! A request arriving while the gate is `Opening` or `Open` is rejected and
//! the current target is pushed back to the framework. `Open` and `Closed`
//! transitions are pushed to the framework since it has no other way to
//! learn about them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use t2o_core::{
    AccessoryKey, CharacteristicUpdate, DoorState, Gate, GateApi, SharedClock, TargetDoorState,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{AccessoryError, AccessoryResult};
use crate::framework::SharedFramework;

/// Modeled travel and dwell times of a physical gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorTimings {
    /// Time from the open pulse until the gate is fully open
    pub opening: Duration,
    /// Time the gate stays open before reclosing on its own
    pub open: Duration,
}

impl Default for DoorTimings {
    fn default() -> Self {
        Self {
            opening: Duration::from_secs(5),
            open: Duration::from_secs(5),
        }
    }
}

/// Door state tracked for one gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateAccessoryState {
    pub online: bool,
    pub target_door_state: TargetDoorState,
    pub current_door_state: DoorState,
}

impl GateAccessoryState {
    fn closed(online: bool) -> Self {
        Self {
            online,
            target_door_state: TargetDoorState::Closed,
            current_door_state: DoorState::Closed,
        }
    }
}

/// State machine for a single gate accessory
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct GateController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    gate: Gate,
    key: AccessoryKey,
    api: Arc<dyn GateApi>,
    framework: SharedFramework,
    clock: SharedClock,
    timings: DoorTimings,
    state: Mutex<GateAccessoryState>,
}

impl GateController {
    /// Create a controller for `gate`, starting closed
    pub fn new(
        gate: Gate,
        api: Arc<dyn GateApi>,
        framework: SharedFramework,
        clock: SharedClock,
        timings: DoorTimings,
        online: bool,
    ) -> Self {
        let key = AccessoryKey::for_gate(gate.gate_id);
        Self {
            inner: Arc::new(ControllerInner {
                gate,
                key,
                api,
                framework,
                clock,
                timings,
                state: Mutex::new(GateAccessoryState::closed(online)),
            }),
        }
    }

    pub fn key(&self) -> AccessoryKey {
        self.inner.key
    }

    pub fn gate(&self) -> &Gate {
        &self.inner.gate
    }

    pub fn timings(&self) -> DoorTimings {
        self.inner.timings
    }

    /// Snapshot of the tracked state
    pub fn state(&self) -> GateAccessoryState {
        *self.inner.lock_state()
    }

    pub fn is_online(&self) -> bool {
        self.inner.lock_state().online
    }

    /// Mark the gate reachable or unreachable
    ///
    /// Door state is left untouched; the gate may be mid-transition.
    pub fn set_online(&self, online: bool) {
        let changed = {
            let mut state = self.inner.lock_state();
            std::mem::replace(&mut state.online, online) != online
        };
        if changed {
            info!(
                gate_id = self.inner.gate.gate_id,
                online,
                "Gate availability changed"
            );
        }
    }

    /// The last requested target; never fails
    pub fn target_door_state(&self) -> TargetDoorState {
        self.inner.lock_state().target_door_state
    }

    /// The tracked door position, or a communication failure while offline
    pub fn current_door_state(&self) -> AccessoryResult<DoorState> {
        let state = self.inner.lock_state();
        if state.online {
            Ok(state.current_door_state)
        } else {
            Err(AccessoryError::CommunicationFailure)
        }
    }

    /// Request the gate to open
    pub async fn request_open(&self) -> AccessoryResult<()> {
        self.set_target_door_state(TargetDoorState::Open).await
    }

    /// Handle a user request for `target`
    ///
    /// Only an open request on a closed gate does anything: it triggers the
    /// remote open and, on success, schedules the `Open` and `Closed`
    /// transitions. There is no remote close command.
    #[instrument(skip(self), fields(gate_id = self.inner.gate.gate_id))]
    pub async fn set_target_door_state(&self, target: TargetDoorState) -> AccessoryResult<()> {
        let inner = &self.inner;

        {
            let mut state = inner.lock_state();
            if state.current_door_state != DoorState::Closed {
                let current_target = state.target_door_state;
                drop(state);

                info!(requested = %target, "Gate is already in motion, ignoring request");
                inner.push(CharacteristicUpdate::TargetDoorState(current_target));
                return Ok(());
            }

            if target == TargetDoorState::Closed {
                debug!("Gate is already closed");
                return Ok(());
            }

            state.target_door_state = TargetDoorState::Open;
            state.current_door_state = DoorState::Opening;
        }

        debug!(name = %inner.gate.description(), "Opening gate");

        match inner.api.open_gate(inner.gate.gate_id).await {
            Ok(()) => {
                self.set_online(true);
                tokio::spawn(Self::run_open_cycle(self.inner.clone()));
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to open gate");
                {
                    let mut state = inner.lock_state();
                    *state = GateAccessoryState::closed(false);
                }
                inner.push(CharacteristicUpdate::CurrentDoorState(DoorState::Closed));
                inner.push(CharacteristicUpdate::TargetDoorState(TargetDoorState::Closed));
                Err(AccessoryError::CommunicationFailure)
            }
        }
    }

    /// Timed transitions after a successful open pulse
    async fn run_open_cycle(inner: Arc<ControllerInner>) {
        inner.clock.sleep(inner.timings.opening).await;
        inner.lock_state().current_door_state = DoorState::Open;
        debug!(gate_id = inner.gate.gate_id, "Gate is open");
        inner.push(CharacteristicUpdate::CurrentDoorState(DoorState::Open));

        inner.clock.sleep(inner.timings.open).await;
        {
            let mut state = inner.lock_state();
            state.current_door_state = DoorState::Closed;
            state.target_door_state = TargetDoorState::Closed;
            if !state.online {
                warn!(gate_id = inner.gate.gate_id, "Gate went offline while open");
            }
        }
        debug!(gate_id = inner.gate.gate_id, "Gate is closed");
        inner.push(CharacteristicUpdate::CurrentDoorState(DoorState::Closed));
        inner.push(CharacteristicUpdate::TargetDoorState(TargetDoorState::Closed));
    }
}

impl ControllerInner {
    fn lock_state(&self) -> MutexGuard<'_, GateAccessoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, update: CharacteristicUpdate) {
        self.framework.update_state(&self.key, update);
    }
}

impl std::fmt::Debug for GateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateController")
            .field("gate_id", &self.inner.gate.gate_id)
            .field("key", &self.inner.key)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{
        AccessoryDescriptor, AccessoryEvent, AccessoryFramework, LocalAccessories,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use t2o_core::{ApiError, ApiResult, ErrorContext, GateId, SystemClock};
    use tokio::sync::broadcast;
    use tokio_test::{assert_err, assert_ok};

    const OPENING: Duration = Duration::from_secs(3);
    const OPEN: Duration = Duration::from_secs(10);

    #[derive(Default)]
    struct MockGateApi {
        opens: AtomicUsize,
        fail: AtomicBool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl GateApi for MockGateApi {
        async fn list_gates(&self) -> ApiResult<Vec<Gate>> {
            Ok(vec![])
        }

        async fn open_gate(&self, _gate_id: GateId) -> ApiResult<()> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::Transport(ErrorContext::with_status(
                    "Failed to open gate",
                    500,
                    Some("Internal Server Error"),
                )));
            }
            Ok(())
        }
    }

    struct Setup {
        api: Arc<MockGateApi>,
        accessories: Arc<LocalAccessories>,
        events: broadcast::Receiver<AccessoryEvent>,
        controller: GateController,
    }

    fn setup_with(api: MockGateApi) -> Setup {
        let api = Arc::new(api);
        let accessories = Arc::new(LocalAccessories::new());
        let gate = Gate::new(42, "Front gate");
        accessories.register_accessory(AccessoryDescriptor::for_gate(&gate));
        let events = accessories.subscribe();

        let controller = GateController::new(
            gate,
            api.clone(),
            accessories.clone(),
            Arc::new(SystemClock),
            DoorTimings {
                opening: OPENING,
                open: OPEN,
            },
            true,
        );

        Setup {
            api,
            accessories,
            events,
            controller,
        }
    }

    fn setup() -> Setup {
        setup_with(MockGateApi::default())
    }

    fn drain(events: &mut broadcast::Receiver<AccessoryEvent>) -> Vec<CharacteristicUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let AccessoryEvent::StateUpdated { update, .. } = event {
                updates.push(update);
            }
        }
        updates
    }

    fn current_updates(updates: &[CharacteristicUpdate]) -> Vec<DoorState> {
        updates
            .iter()
            .filter_map(|u| match u {
                CharacteristicUpdate::CurrentDoorState(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_starts_closed() {
        let s = setup();
        assert_eq!(
            s.controller.state(),
            GateAccessoryState {
                online: true,
                target_door_state: TargetDoorState::Closed,
                current_door_state: DoorState::Closed,
            }
        );
        assert_eq!(s.controller.key(), AccessoryKey::for_gate(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_cycle_timing() {
        let mut s = setup();

        assert_ok!(s.controller.request_open().await);
        assert_eq!(s.controller.current_door_state(), Ok(DoorState::Opening));
        assert_eq!(s.controller.target_door_state(), TargetDoorState::Open);

        tokio::time::sleep(OPENING - Duration::from_millis(1)).await;
        assert_eq!(s.controller.current_door_state(), Ok(DoorState::Opening));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(s.controller.current_door_state(), Ok(DoorState::Open));

        tokio::time::sleep(OPEN - Duration::from_millis(2)).await;
        assert_eq!(s.controller.current_door_state(), Ok(DoorState::Open));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(s.controller.current_door_state(), Ok(DoorState::Closed));
        assert_eq!(s.controller.target_door_state(), TargetDoorState::Closed);

        let updates = drain(&mut s.events);
        assert_eq!(
            current_updates(&updates),
            vec![DoorState::Open, DoorState::Closed]
        );
        assert_eq!(s.api.opens.load(Ordering::SeqCst), 1);

        let record = s.accessories.get(&AccessoryKey::for_gate(42)).unwrap();
        assert_eq!(record.current_door_state, Some(DoorState::Closed));
        assert_eq!(record.target_door_state, Some(TargetDoorState::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_request_while_opening_is_ignored() {
        let mut s = setup();

        assert_ok!(s.controller.request_open().await);
        assert_ok!(s.controller.request_open().await);

        assert_eq!(s.api.opens.load(Ordering::SeqCst), 1);
        assert_eq!(s.controller.target_door_state(), TargetDoorState::Open);
        assert_eq!(
            drain(&mut s.events),
            vec![CharacteristicUpdate::TargetDoorState(TargetDoorState::Open)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_request_while_open_reasserts_target() {
        let mut s = setup();

        assert_ok!(s.controller.request_open().await);
        tokio::time::sleep(OPENING + Duration::from_millis(1)).await;
        drain(&mut s.events);

        assert_ok!(
            s.controller
                .set_target_door_state(TargetDoorState::Closed)
                .await
        );

        assert_eq!(s.controller.target_door_state(), TargetDoorState::Open);
        assert_eq!(s.controller.current_door_state(), Ok(DoorState::Open));
        assert_eq!(
            drain(&mut s.events),
            vec![CharacteristicUpdate::TargetDoorState(TargetDoorState::Open)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_during_inflight_open_call_is_ignored() {
        let s = setup_with(MockGateApi {
            delay: Some(Duration::from_secs(1)),
            ..Default::default()
        });

        let first = {
            let controller = s.controller.clone();
            tokio::spawn(async move { controller.request_open().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(s.controller.current_door_state(), Ok(DoorState::Opening));

        assert_ok!(s.controller.request_open().await);
        assert_ok!(first.await.unwrap());

        assert_eq!(s.api.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_request_when_closed_does_nothing() {
        let mut s = setup();

        assert_ok!(
            s.controller
                .set_target_door_state(TargetDoorState::Closed)
                .await
        );

        assert_eq!(s.api.opens.load(Ordering::SeqCst), 0);
        assert_eq!(s.controller.current_door_state(), Ok(DoorState::Closed));
        assert!(drain(&mut s.events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_open_goes_closed_and_offline() {
        let s = setup_with(MockGateApi {
            fail: AtomicBool::new(true),
            ..Default::default()
        });

        let result = s.controller.request_open().await;

        assert_eq!(assert_err!(result), AccessoryError::CommunicationFailure);
        let state = s.controller.state();
        assert_eq!(state.current_door_state, DoorState::Closed);
        assert_eq!(state.target_door_state, TargetDoorState::Closed);
        assert!(!state.online);
        assert_eq!(
            s.controller.current_door_state(),
            Err(AccessoryError::CommunicationFailure)
        );
        assert_eq!(s.controller.target_door_state(), TargetDoorState::Closed);

        // Nothing is scheduled after a failure
        tokio::time::sleep(OPENING + OPEN + Duration::from_secs(1)).await;
        assert_eq!(s.controller.state().current_door_state, DoorState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_open_brings_gate_back_online() {
        let s = setup_with(MockGateApi {
            fail: AtomicBool::new(true),
            ..Default::default()
        });

        assert_err!(s.controller.request_open().await);
        assert!(!s.controller.is_online());

        s.api.fail.store(false, Ordering::SeqCst);
        assert_ok!(s.controller.request_open().await);

        assert!(s.controller.is_online());
        assert_eq!(s.controller.current_door_state(), Ok(DoorState::Opening));
        assert_eq!(s.api.opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_offline_gate_fails_current_state_query_only() {
        let s = setup();

        s.controller.set_online(false);

        assert_eq!(
            s.controller.current_door_state(),
            Err(AccessoryError::CommunicationFailure)
        );
        assert_eq!(s.controller.target_door_state(), TargetDoorState::Closed);

        s.controller.set_online(true);
        assert_eq!(s.controller.current_door_state(), Ok(DoorState::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_going_offline_mid_cycle_keeps_timers_running() {
        let s = setup();

        assert_ok!(s.controller.request_open().await);
        s.controller.set_online(false);
        tokio::time::sleep(OPENING + OPEN + Duration::from_millis(1)).await;

        let state = s.controller.state();
        assert!(!state.online);
        assert_eq!(state.current_door_state, DoorState::Closed);
        assert_eq!(state.target_door_state, TargetDoorState::Closed);
    }
}
