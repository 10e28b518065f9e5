//! Geolocation boundary: one-shot and continuous position acquisition.
//!
//! The platform capability sits behind [`LocationProvider`] so the
//! controller can run against the simulated demo provider or a test
//! mock. The continuous subscription is an owned resource: the
//! provider hands back a [`WatchSubscription`] whose handle cancels
//! exactly once, on `cancel()` or on drop.

pub mod simulated;
pub mod tracker;

use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};

use crate::config;
use crate::models::Location;

pub use simulated::SimulatedLocationProvider;
pub use tracker::LocationTracker;

/// Buffered continuous fixes before the provider task backpressures.
const WATCH_CHANNEL_CAPACITY: usize = 16;

// ═══════════════════════════════════════════════════════════
// Acquisition preferences
// ═══════════════════════════════════════════════════════════

/// Preferences passed to both acquisition modes.
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionOptions {
    /// Prefer GPS-grade fixes over coarse network positioning.
    pub high_accuracy: bool,
    /// Give up on a fix after this long.
    pub timeout: Duration,
    /// Oldest cached fix the provider may return. Zero = fresh only.
    pub max_cached_age: Duration,
}

impl Default for AcquisitionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: config::ACQUISITION_TIMEOUT,
            max_cached_age: Duration::ZERO,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Error taxonomy
// ═══════════════════════════════════════════════════════════

/// Why position acquisition failed. Each cause maps to a distinct
/// user-facing message; all are fatal to the current SOS attempt only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("geolocation is not supported on this device")]
    Unsupported,
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("location acquisition timed out")]
    Timeout,
    #[error("unknown geolocation failure")]
    Unknown,
}

impl GeolocationError {
    /// Message shown to the patient when a send attempt fails.
    pub fn user_message(&self) -> &'static str {
        match self {
            GeolocationError::Unsupported => {
                "Geolocation is not supported on this device."
            }
            GeolocationError::PermissionDenied => {
                "Location permission denied. Please enable it in your device settings to use this feature."
            }
            GeolocationError::PositionUnavailable => {
                "Could not determine your location. Please check your connection and try again."
            }
            GeolocationError::Timeout => {
                "Getting your location took too long. Please try again."
            }
            GeolocationError::Unknown => {
                "Please enable location services and try again."
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Watch subscription — owned, cancel-once resource
// ═══════════════════════════════════════════════════════════

/// Cancellation handle for a continuous watch. `cancel()` takes the
/// inner sender, so a second call (or a cancel after drop) is a no-op
/// rather than a double release.
#[derive(Debug)]
pub struct WatchHandle {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl WatchHandle {
    pub fn new(cancel_tx: oneshot::Sender<()>) -> Self {
        Self {
            cancel_tx: Some(cancel_tx),
        }
    }

    /// Stop the provider's watch task. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
            tracing::debug!("Location watch cancelled");
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A live continuous watch: the stream of fixes plus its handle.
pub struct WatchSubscription {
    /// Fixes arrive in callback order; consumers keep only the latest.
    pub updates: mpsc::Receiver<Location>,
    pub handle: WatchHandle,
}

/// Platform position capability. Object-safe so the controller can
/// hold `Arc<dyn LocationProvider>`.
pub trait LocationProvider: Send + Sync {
    /// Whether the capability exists at all. A send attempt must not
    /// even enter SENDING when this is false.
    fn is_supported(&self) -> bool {
        true
    }

    /// Acquire a single fresh fix.
    fn current_position(
        &self,
        options: AcquisitionOptions,
    ) -> BoxFuture<'_, Result<Location, GeolocationError>>;

    /// Start a continuous watch. Fixes are delivered on the returned
    /// channel until the handle is cancelled.
    fn watch_position(
        &self,
        options: AcquisitionOptions,
    ) -> Result<WatchSubscription, GeolocationError>;
}

/// Open the update channel used by provider watch tasks.
pub(crate) fn watch_channel() -> (mpsc::Sender<Location>, mpsc::Receiver<Location>) {
    mpsc::channel(WATCH_CHANNEL_CAPACITY)
}

// ═══════════════════════════════════════════════════════════
// Test provider
// ═══════════════════════════════════════════════════════════
