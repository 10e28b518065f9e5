//! SOS lifecycle controller — the single owner of alert state.
//!
//! `SosController` replaces the original's role-keyed global UI state
//! with one explicitly owned object shared between views. Commands
//! mutate under a single lock; every transition publishes an immutable
//! [`SosSnapshot`] over a `watch` channel so views subscribe instead
//! of reading shared mutables.
//!
//! Delayed effects (the simulated send delay, the rejected auto-reset,
//! the continuous-update pump, a late one-shot acquisition) are keyed
//! to a generation counter. Re-arming the machine bumps the counter;
//! a callback whose generation no longer matches is discarded instead
//! of applied, so a stale timer can never corrupt state.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::config;
use crate::geolocation::{
    AcquisitionOptions, GeolocationError, LocationProvider, LocationTracker,
};
use crate::models::{Location, MedicalProfile, Role, SosRequest, SosStatus};

// ═══════════════════════════════════════════════════════════
// Snapshot — the published view state
// ═══════════════════════════════════════════════════════════

/// Immutable state snapshot handed to views. Views must prefer
/// `live_location` over `request.location` when both are present.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SosSnapshot {
    pub role: Role,
    pub status: SosStatus,
    pub doctor_online: bool,
    pub request: Option<SosRequest>,
    pub live_location: Option<Location>,
    pub tracking: bool,
    /// Status line or acquisition-failure text for the patient view.
    pub message: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

/// Errors from controller commands.
#[derive(Debug, thiserror::Error)]
pub enum SosError {
    #[error("No active SOS request")]
    NoActiveRequest,
    #[error("Doctor is offline")]
    DoctorOffline,
    #[error("Internal lock error")]
    LockPoisoned,
}

// ═══════════════════════════════════════════════════════════
// Controller
// ═══════════════════════════════════════════════════════════

struct ControllerState {
    role: Role,
    status: SosStatus,
    doctor_online: bool,
    request: Option<SosRequest>,
    live_location: Option<Location>,
    message: Option<String>,
    /// Bumped on every re-arm; stale callbacks check it before acting.
    generation: u64,
}

impl ControllerState {
    fn snapshot(&self, tracking: bool) -> SosSnapshot {
        SosSnapshot {
            role: self.role,
            status: self.status,
            doctor_online: self.doctor_online,
            request: self.request.clone(),
            live_location: self.live_location,
            tracking,
            message: self.message.clone(),
        }
    }

    /// Re-arm to idle: used by reset, decline (partially) and role
    /// switches. Invalidates every outstanding delayed effect.
    fn rearm(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

pub struct SosController {
    provider: Arc<dyn LocationProvider>,
    tracker: LocationTracker,
    patient: MedicalProfile,
    state: Mutex<ControllerState>,
    updates: watch::Sender<SosSnapshot>,
    /// Self-handle so `&self` commands can spawn background tasks.
    self_ref: Weak<SosController>,
}

impl SosController {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        patient: MedicalProfile,
    ) -> Arc<Self> {
        let state = ControllerState {
            role: Role::Patient,
            status: SosStatus::Idle,
            doctor_online: false,
            request: None,
            live_location: None,
            message: None,
            generation: 0,
        };
        let (updates, _) = watch::channel(state.snapshot(false));
        Arc::new_cyclic(|self_ref| Self {
            tracker: LocationTracker::new(
                Arc::clone(&provider),
                AcquisitionOptions::default(),
            ),
            provider,
            patient,
            state: Mutex::new(state),
            updates,
            self_ref: self_ref.clone(),
        })
    }

    /// Subscribe to state snapshots. The receiver always holds the
    /// latest value (last-write-wins, no buffering).
    pub fn subscribe(&self) -> watch::Receiver<SosSnapshot> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> Result<SosSnapshot, SosError> {
        let state = self.lock_state()?;
        Ok(state.snapshot(self.tracker.is_active()))
    }

    pub fn patient_profile(&self) -> &MedicalProfile {
        &self.patient
    }

    #[cfg(test)]
    pub(crate) fn is_tracking(&self) -> bool {
        self.tracker.is_active()
    }

    // ── Commands ────────────────────────────────────────────

    /// Raise an SOS. No-op outside Idle/Rejected; from Rejected the
    /// machine is re-armed first, cancelling the pending auto-reset.
    pub fn send(&self) -> Result<SosSnapshot, SosError> {
        let generation = {
            let mut state = self.lock_state()?;
            if !state.status.can_send() {
                tracing::debug!(status = ?state.status, "Ignoring send outside idle");
                return Ok(state.snapshot(self.tracker.is_active()));
            }
            if !self.provider.is_supported() {
                // Fatal to the attempt; never enters SENDING.
                tracing::error!("Geolocation capability unavailable");
                state.message =
                    Some(GeolocationError::Unsupported.user_message().to_string());
                state.status = SosStatus::Idle;
                drop(state);
                return self.publish();
            }
            let generation = state.rearm();
            state.status = SosStatus::Sending;
            state.request = None;
            state.message = SosStatus::Sending
                .patient_message()
                .map(str::to_string);
            generation
        };
        tracing::info!("Requesting location and sending SOS");

        if let Some(controller) = self.self_ref.upgrade() {
            tokio::spawn(async move {
                controller.run_send(generation).await;
            });
        }
        self.publish()
    }

    /// Doctor accepts the incoming alert. Terminal success state;
    /// tracking continues until the patient ends the alert.
    pub fn accept(&self) -> Result<SosSnapshot, SosError> {
        {
            let mut state = self.lock_state()?;
            if state.request.is_none() || state.status != SosStatus::Sent {
                return Err(SosError::NoActiveRequest);
            }
            if !state.doctor_online {
                return Err(SosError::DoctorOffline);
            }
            state.status = SosStatus::Accepted;
            state.message = SosStatus::Accepted
                .patient_message()
                .map(str::to_string);
        }
        tracing::info!("SOS accepted by doctor");
        self.publish()
    }

    /// Doctor declines. Clears the request and stops tracking
    /// immediately, regardless of prior status, then auto-resets.
    pub fn decline(&self) -> Result<SosSnapshot, SosError> {
        let generation = {
            let mut state = self.lock_state()?;
            let generation = state.rearm();
            state.request = None;
            state.status = SosStatus::Rejected;
            state.message = SosStatus::Rejected
                .patient_message()
                .map(str::to_string);
            generation
        };
        self.tracker.stop();
        tracing::info!("SOS declined by doctor");
        self.schedule_auto_reset(generation);
        self.publish()
    }

    /// Return to idle: request cleared, tracking stopped, message
    /// cleared. Idempotent, callable from any status.
    pub fn reset(&self) -> Result<SosSnapshot, SosError> {
        {
            let mut state = self.lock_state()?;
            state.rearm();
            state.status = SosStatus::Idle;
            state.request = None;
            state.live_location = None;
            state.message = None;
        }
        self.tracker.stop();
        tracing::debug!("SOS state reset");
        self.publish()
    }

    /// Toggle doctor availability. Read at send-resolution time.
    pub fn set_doctor_online(&self, online: bool) -> Result<SosSnapshot, SosError> {
        {
            let mut state = self.lock_state()?;
            state.doctor_online = online;
        }
        tracing::info!(online, "Doctor availability changed");
        self.publish()
    }

    /// Switch the active role. Always implies a reset so no alert
    /// survives the role change.
    pub fn switch_role(&self, role: Role) -> Result<SosSnapshot, SosError> {
        {
            let mut state = self.lock_state()?;
            state.role = role;
            state.rearm();
            state.status = SosStatus::Idle;
            state.request = None;
            state.live_location = None;
            state.message = None;
        }
        self.tracker.stop();
        tracing::info!(%role, "Role switched, SOS state reset");
        self.publish()
    }

    // ── Send pipeline ───────────────────────────────────────

    async fn run_send(self: Arc<Self>, generation: u64) {
        let (initial, updates) = match self.tracker.start().await {
            Ok(started) => started,
            Err(error) => {
                self.fail_send(generation, error);
                return;
            }
        };

        // A reset or role switch may have happened while the one-shot
        // was in flight; discard the late acquisition and release the
        // watch it just registered.
        {
            let Ok(mut state) = self.state.lock() else { return };
            if state.generation != generation || state.status != SosStatus::Sending {
                drop(state);
                tracing::debug!("Discarding stale location acquisition");
                self.tracker.stop();
                return;
            }
            state.live_location = Some(initial);
        }
        let _ = self.publish();

        let pump = Arc::clone(&self);
        tokio::spawn(async move {
            pump.pump_updates(generation, updates).await;
        });

        // Simulated network delay before the send resolves.
        tokio::time::sleep(config::SEND_RESOLVE_DELAY).await;
        self.resolve_send(generation, initial);
    }

    /// Acquisition failed: surface the cause and return to idle.
    fn fail_send(&self, generation: u64, error: GeolocationError) {
        let Ok(mut state) = self.state.lock() else { return };
        if state.generation != generation || state.status != SosStatus::Sending {
            return;
        }
        tracing::error!(%error, "Could not get current position");
        state.status = SosStatus::Idle;
        state.message = Some(error.user_message().to_string());
        drop(state);
        let _ = self.publish();
    }

    /// The simulated acknowledgment: doctor availability is evaluated
    /// now, not at send time.
    fn resolve_send(&self, generation: u64, initial: Location) {
        let rejected = {
            let Ok(mut state) = self.state.lock() else { return };
            if state.generation != generation || state.status != SosStatus::Sending {
                tracing::debug!("Discarding stale send resolution");
                return;
            }
            if state.doctor_online {
                state.request =
                    Some(SosRequest::new(self.patient.clone(), initial));
                state.status = SosStatus::Sent;
                state.message =
                    SosStatus::Sent.patient_message().map(str::to_string);
                false
            } else {
                state.status = SosStatus::Rejected;
                state.message =
                    SosStatus::Rejected.patient_message().map(str::to_string);
                true
            }
        };

        if rejected {
            tracing::info!("No doctors available, SOS rejected");
            self.tracker.stop();
            self.schedule_auto_reset(generation);
        } else {
            tracing::info!("SOS sent to available doctors");
        }
        let _ = self.publish();
    }

    /// After a rejection the machine returns to idle on its own. The
    /// generation guard discards the timer if anything re-armed the
    /// machine in the meantime.
    fn schedule_auto_reset(&self, generation: u64) {
        let Some(controller) = self.self_ref.upgrade() else { return };
        tokio::spawn(async move {
            tokio::time::sleep(config::REJECTED_RESET_DELAY).await;
            {
                let Ok(mut state) = controller.state.lock() else { return };
                if state.generation != generation
                    || state.status != SosStatus::Rejected
                {
                    tracing::debug!("Discarding stale auto-reset");
                    return;
                }
                state.status = SosStatus::Idle;
                state.message = None;
                state.live_location = None;
            }
            let _ = controller.publish();
        });
    }

    /// Forward continuous fixes into the published state until the
    /// watch closes or the machine is re-armed. Last write wins.
    async fn pump_updates(
        self: Arc<Self>,
        generation: u64,
        mut updates: mpsc::Receiver<Location>,
    ) {
        while let Some(fix) = updates.recv().await {
            {
                let Ok(mut state) = self.state.lock() else { return };
                if state.generation != generation {
                    return;
                }
                state.live_location = Some(fix);
            }
            tracing::debug!(
                latitude = fix.latitude,
                longitude = fix.longitude,
                "Location updated"
            );
            let _ = self.publish();
        }
    }

    // ── Internals ───────────────────────────────────────────

    fn lock_state(&self) -> Result<MutexGuard<'_, ControllerState>, SosError> {
        self.state.lock().map_err(|_| SosError::LockPoisoned)
    }

    fn publish(&self) -> Result<SosSnapshot, SosError> {
        let snapshot = self.snapshot()?;
        self.updates.send_replace(snapshot.clone());
        Ok(snapshot)
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::geolocation::testing::MockProvider;

    fn fix() -> Location {
        Location {
            latitude: 10.0,
            longitude: 20.0,
            accuracy: 5.0,
        }
    }

    fn controller_with(provider: Arc<MockProvider>) -> Arc<SosController> {
        SosController::new(provider, MedicalProfile::demo())
    }

    fn online_controller(provider: Arc<MockProvider>) -> Arc<SosController> {
        let controller = controller_with(provider);
        controller.set_doctor_online(true).unwrap();
        controller
    }

    /// Let the spawned send pipeline and its timers run to completion.
    /// With a paused clock, sleeping past the resolve delay advances
    /// virtual time deterministically.
    async fn settle(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    const PAST_RESOLVE: Duration = Duration::from_millis(1600);
    const PAST_AUTO_RESET: Duration = Duration::from_millis(4700);

    #[tokio::test(start_paused = true)]
    async fn send_with_doctor_online_transitions_to_sent() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = online_controller(Arc::clone(&provider));

        let before = chrono::Utc::now();
        let snapshot = controller.send().unwrap();
        assert_eq!(snapshot.status, SosStatus::Sending);

        settle(PAST_RESOLVE).await;

        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.status, SosStatus::Sent);
        let request = snapshot.request.expect("request must exist after SENT");
        assert_eq!(request.location, fix());
        assert!(request.timestamp >= before);
        assert!(controller.is_tracking());
        assert_eq!(
            snapshot.message.as_deref(),
            SosStatus::Sent.patient_message()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn send_with_doctor_offline_rejects_then_auto_resets() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = controller_with(Arc::clone(&provider));

        controller.send().unwrap();
        settle(PAST_RESOLVE).await;

        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.status, SosStatus::Rejected);
        assert!(snapshot.request.is_none());
        assert!(!controller.is_tracking());

        settle(PAST_AUTO_RESET).await;
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.status, SosStatus::Idle);
        assert!(snapshot.request.is_none());
        assert!(snapshot.message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn send_is_a_noop_outside_idle_and_rejected() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = online_controller(Arc::clone(&provider));

        controller.send().unwrap();
        // Second send while SENDING changes nothing
        let snapshot = controller.send().unwrap();
        assert_eq!(snapshot.status, SosStatus::Sending);

        settle(PAST_RESOLVE).await;
        assert_eq!(provider.watches_started(), 1);

        // Send while SENT is also ignored
        let request_id = controller.snapshot().unwrap().request.unwrap().id;
        controller.send().unwrap();
        settle(PAST_RESOLVE).await;
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.status, SosStatus::Sent);
        assert_eq!(snapshot.request.unwrap().id, request_id);
        assert_eq!(provider.watches_started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn permission_denied_returns_to_idle_with_message() {
        let provider =
            Arc::new(MockProvider::failing(GeolocationError::PermissionDenied));
        let controller = online_controller(Arc::clone(&provider));

        controller.send().unwrap();
        settle(PAST_RESOLVE).await;

        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.status, SosStatus::Idle);
        assert!(snapshot.request.is_none());
        assert!(!controller.is_tracking());
        assert_eq!(provider.watches_started(), 0);
        assert_eq!(
            snapshot.message.as_deref(),
            Some(GeolocationError::PermissionDenied.user_message())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_capability_never_enters_sending() {
        let provider = Arc::new(MockProvider::unsupported());
        let controller = online_controller(provider);

        let snapshot = controller.send().unwrap();
        assert_eq!(snapshot.status, SosStatus::Idle);
        assert_eq!(
            snapshot.message.as_deref(),
            Some(GeolocationError::Unsupported.user_message())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn accept_moves_sent_to_accepted_and_keeps_tracking() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = online_controller(Arc::clone(&provider));

        controller.send().unwrap();
        settle(PAST_RESOLVE).await;

        let snapshot = controller.accept().unwrap();
        assert_eq!(snapshot.status, SosStatus::Accepted);
        assert!(snapshot.request.is_some());
        assert!(controller.is_tracking());
    }

    #[tokio::test(start_paused = true)]
    async fn accept_without_request_is_an_error() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = online_controller(provider);
        assert!(matches!(
            controller.accept(),
            Err(SosError::NoActiveRequest)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn accept_with_doctor_offline_is_an_error() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = online_controller(Arc::clone(&provider));

        controller.send().unwrap();
        settle(PAST_RESOLVE).await;
        controller.set_doctor_online(false).unwrap();

        assert!(matches!(controller.accept(), Err(SosError::DoctorOffline)));
    }

    #[tokio::test(start_paused = true)]
    async fn decline_clears_request_and_stops_tracking_immediately() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = online_controller(Arc::clone(&provider));

        controller.send().unwrap();
        settle(PAST_RESOLVE).await;
        assert!(controller.is_tracking());

        let snapshot = controller.decline().unwrap();
        assert_eq!(snapshot.status, SosStatus::Rejected);
        assert!(snapshot.request.is_none());
        // Tracking stops at decline, not after the auto-reset delay
        assert!(!controller.is_tracking());

        settle(PAST_AUTO_RESET).await;
        assert_eq!(controller.snapshot().unwrap().status, SosStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_from_any_status_yields_idle() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = online_controller(Arc::clone(&provider));

        controller.send().unwrap();
        settle(PAST_RESOLVE).await;
        controller.accept().unwrap();

        let snapshot = controller.reset().unwrap();
        assert_eq!(snapshot.status, SosStatus::Idle);
        assert!(snapshot.request.is_none());
        assert!(snapshot.live_location.is_none());
        assert!(!controller.is_tracking());

        // Idempotent
        let snapshot = controller.reset().unwrap();
        assert_eq!(snapshot.status, SosStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn role_switch_implies_reset() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = online_controller(Arc::clone(&provider));

        controller.send().unwrap();
        settle(PAST_RESOLVE).await;
        assert!(controller.snapshot().unwrap().request.is_some());

        let snapshot = controller.switch_role(Role::Doctor).unwrap();
        assert_eq!(snapshot.role, Role::Doctor);
        assert_eq!(snapshot.status, SosStatus::Idle);
        assert!(snapshot.request.is_none());
        assert!(!controller.is_tracking());
    }

    #[tokio::test(start_paused = true)]
    async fn resend_from_rejected_cancels_stale_auto_reset() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = controller_with(Arc::clone(&provider));

        // First attempt rejected (doctor offline)
        controller.send().unwrap();
        settle(PAST_RESOLVE).await;
        assert_eq!(controller.snapshot().unwrap().status, SosStatus::Rejected);

        // Retry immediately from REJECTED, now with a doctor online
        controller.set_doctor_online(true).unwrap();
        controller.send().unwrap();
        settle(PAST_RESOLVE).await;
        assert_eq!(controller.snapshot().unwrap().status, SosStatus::Sent);

        // The first cycle's auto-reset timer fires into the new cycle
        // and must be discarded
        settle(PAST_AUTO_RESET).await;
        assert_eq!(controller.snapshot().unwrap().status, SosStatus::Sent);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_during_acquisition_discards_late_fix() {
        let provider = Arc::new(
            MockProvider::with_fix(fix())
                .with_acquire_delay(Duration::from_millis(500)),
        );
        let controller = online_controller(Arc::clone(&provider));

        controller.send().unwrap();
        settle(Duration::from_millis(100)).await;
        controller.reset().unwrap();

        // Acquisition completes after the reset; its result and the
        // watch it registered are both discarded
        settle(PAST_AUTO_RESET).await;
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.status, SosStatus::Idle);
        assert!(snapshot.request.is_none());
        assert!(!controller.is_tracking());
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_updates_reach_the_snapshot() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = online_controller(Arc::clone(&provider));
        let mut updates = controller.subscribe();

        controller.send().unwrap();
        settle(PAST_RESOLVE).await;

        let moved = Location {
            latitude: 10.002,
            longitude: 20.002,
            accuracy: 7.0,
        };
        assert!(provider.push_update(moved).await);
        settle(Duration::from_millis(50)).await;

        updates.changed().await.unwrap();
        let snapshot = updates.borrow().clone();
        assert_eq!(snapshot.live_location, Some(moved));
        // The stored request keeps the initial fix untouched
        assert_eq!(snapshot.request.unwrap().location, fix());
    }

    #[tokio::test(start_paused = true)]
    async fn status_is_always_one_of_the_five() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = online_controller(Arc::clone(&provider));

        // Walk the full lifecycle and check every observed snapshot
        let observed = [
            controller.snapshot().unwrap().status,
            controller.send().unwrap().status,
            {
                settle(PAST_RESOLVE).await;
                controller.snapshot().unwrap().status
            },
            controller.accept().unwrap().status,
            controller.reset().unwrap().status,
        ];
        for status in observed {
            assert!(matches!(
                status,
                SosStatus::Idle
                    | SosStatus::Sending
                    | SosStatus::Sent
                    | SosStatus::Accepted
                    | SosStatus::Rejected
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn request_exists_iff_sent_or_accepted() {
        let provider = Arc::new(MockProvider::with_fix(fix()));
        let controller = online_controller(Arc::clone(&provider));

        assert!(controller.snapshot().unwrap().request.is_none());
        controller.send().unwrap();
        assert!(controller.snapshot().unwrap().request.is_none());

        settle(PAST_RESOLVE).await;
        assert!(controller.snapshot().unwrap().request.is_some());

        controller.accept().unwrap();
        assert!(controller.snapshot().unwrap().request.is_some());

        controller.decline().unwrap();
        assert!(controller.snapshot().unwrap().request.is_none());
    }
}
