//! Location tracking lifecycle: one-shot fix, then a continuous watch
//! whose handle lives here until `stop()` or teardown.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::geolocation::{
    AcquisitionOptions, GeolocationError, LocationProvider, WatchSubscription,
};
use crate::models::Location;

/// Bridges the controller to the platform position capability and
/// owns the lifetime of the continuous subscription.
///
/// At most one watch is active at a time. The controller starts
/// tracking once per send cycle and stops it on decline/reset, so a
/// fresh `start` normally finds no prior handle; a leftover one is
/// cancelled before being replaced.
pub struct LocationTracker {
    provider: Arc<dyn LocationProvider>,
    options: AcquisitionOptions,
    watch: Mutex<Option<super::WatchHandle>>,
}

impl LocationTracker {
    pub fn new(provider: Arc<dyn LocationProvider>, options: AcquisitionOptions) -> Self {
        Self {
            provider,
            options,
            watch: Mutex::new(None),
        }
    }

    /// Acquire a one-shot fix, then register the continuous watch.
    ///
    /// On success returns the initial location and the stream of
    /// follow-up fixes; the cancellation handle stays inside the
    /// tracker. On failure no watch is started.
    pub async fn start(
        &self,
    ) -> Result<(Location, mpsc::Receiver<Location>), GeolocationError> {
        let initial = self.provider.current_position(self.options).await?;
        let WatchSubscription { updates, handle } =
            self.provider.watch_position(self.options)?;

        if let Ok(mut watch) = self.watch.lock() {
            if let Some(mut previous) = watch.replace(handle) {
                tracing::warn!("Replacing a still-active location watch");
                previous.cancel();
            }
        }

        tracing::info!(
            latitude = initial.latitude,
            longitude = initial.longitude,
            accuracy = initial.accuracy,
            "Location tracking started"
        );
        Ok((initial, updates))
    }

    /// Cancel the continuous subscription if one is active.
    ///
    /// Safe to call when idle; the handle is taken out of the slot so
    /// a later stop cannot double-cancel.
    pub fn stop(&self) {
        if let Ok(mut watch) = self.watch.lock() {
            if let Some(mut handle) = watch.take() {
                handle.cancel();
                tracing::info!("Stopped location tracking");
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.watch.lock().map(|watch| watch.is_some()).unwrap_or(false)
    }
}

impl Drop for LocationTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
