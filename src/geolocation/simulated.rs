//! Simulated position capability for the demo.
//!
//! There is no real GPS in a desktop demo, so this provider plants the
//! patient at a configured fix and drifts it with a small random walk
//! on every continuous update, the way a phone held by a walking
//! person would read.

use std::time::Duration;

use futures_util::future::BoxFuture;
use rand::Rng;
use tokio::sync::oneshot;

use crate::config;
use crate::geolocation::{
    watch_channel, AcquisitionOptions, GeolocationError, LocationProvider,
    WatchHandle, WatchSubscription,
};
use crate::models::Location;

/// Maximum drift per update, in degrees (~55 m at the equator).
const DRIFT_PER_UPDATE_DEG: f64 = 0.0005;

/// Accuracy spread reported with each simulated fix, in meters.
const ACCURACY_JITTER_M: f64 = 8.0;

pub struct SimulatedLocationProvider {
    base: Location,
    watch_interval: Duration,
    fix_delay: Duration,
    /// Scripted one-shot failure, for demoing the error paths.
    forced_failure: Option<GeolocationError>,
    supported: bool,
}

impl SimulatedLocationProvider {
    pub fn new(base: Location) -> Self {
        Self {
            base,
            watch_interval: config::SIMULATED_WATCH_INTERVAL,
            fix_delay: config::SIMULATED_FIX_DELAY,
            forced_failure: None,
            supported: true,
        }
    }

    /// The stock demo provider, positioned at [`config::DEMO_FIX`].
    pub fn demo() -> Self {
        Self::new(config::DEMO_FIX)
    }

    /// Every acquisition fails with `error` until reconfigured.
    pub fn with_forced_failure(mut self, error: GeolocationError) -> Self {
        self.forced_failure = Some(error);
        self
    }

    /// Simulate a platform without geolocation at all.
    pub fn without_capability(mut self) -> Self {
        self.supported = false;
        self
    }

    fn jittered(&self, around: Location) -> Location {
        let mut rng = rand::thread_rng();
        Location {
            latitude: around.latitude + rng.gen_range(-DRIFT_PER_UPDATE_DEG..=DRIFT_PER_UPDATE_DEG),
            longitude: around.longitude
                + rng.gen_range(-DRIFT_PER_UPDATE_DEG..=DRIFT_PER_UPDATE_DEG),
            accuracy: (around.accuracy + rng.gen_range(-ACCURACY_JITTER_M..=ACCURACY_JITTER_M))
                .max(1.0),
        }
    }
}

impl LocationProvider for SimulatedLocationProvider {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn current_position(
        &self,
        options: AcquisitionOptions,
    ) -> BoxFuture<'_, Result<Location, GeolocationError>> {
        let outcome = match self.forced_failure {
            Some(error) => Err(error),
            None => Ok(self.jittered(self.base)),
        };
        let delay = self.fix_delay;
        Box::pin(async move {
            let acquire = async {
                tokio::time::sleep(delay).await;
                outcome
            };
            // The platform contract enforces the caller's timeout.
            match tokio::time::timeout(options.timeout, acquire).await {
                Ok(result) => result,
                Err(_) => Err(GeolocationError::Timeout),
            }
        })
    }

    fn watch_position(
        &self,
        _options: AcquisitionOptions,
    ) -> Result<WatchSubscription, GeolocationError> {
        if let Some(error) = self.forced_failure {
            return Err(error);
        }

        let (tx, rx) = watch_channel();
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        let base = self.base;
        let interval = self.watch_interval;
        let walker = Walker { base };

        tokio::spawn(async move {
            let mut current = base;
            let mut ticks = tokio::time::interval(interval);
            ticks.tick().await; // consume the immediate first tick
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    _ = ticks.tick() => {
                        current = walker.step(current);
                        // Receiver gone means the consumer tore down
                        // without cancelling; end the walk either way.
                        if tx.send(current).await.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Simulated walk ended");
        });

        Ok(WatchSubscription {
            updates: rx,
            handle: WatchHandle::new(cancel_tx),
        })
    }
}

/// Random-walk stepper for the watch task. Drift is bounded so the
/// simulated patient stays near the base fix.
struct Walker {
    base: Location,
}

impl Walker {
    fn step(&self, from: Location) -> Location {
        let mut rng = rand::thread_rng();
        let clamp = |value: f64, center: f64| {
            value.clamp(center - 100.0 * DRIFT_PER_UPDATE_DEG, center + 100.0 * DRIFT_PER_UPDATE_DEG)
        };
        Location {
            latitude: clamp(
                from.latitude + rng.gen_range(-DRIFT_PER_UPDATE_DEG..=DRIFT_PER_UPDATE_DEG),
                self.base.latitude,
            ),
            longitude: clamp(
                from.longitude + rng.gen_range(-DRIFT_PER_UPDATE_DEG..=DRIFT_PER_UPDATE_DEG),
                self.base.longitude,
            ),
            accuracy: (from.accuracy
                + rng.gen_range(-ACCURACY_JITTER_M / 2.0..=ACCURACY_JITTER_M / 2.0))
                .clamp(1.0, 50.0),
        }
    }
}
