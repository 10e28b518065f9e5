use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::models::Location;

/// Application-level constants
pub const APP_NAME: &str = "MedAlert";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulated network delay between location capture and send resolution.
pub const SEND_RESOLVE_DELAY: Duration = Duration::from_millis(1500);

/// How long a rejected SOS stays visible before auto-resetting to idle.
pub const REJECTED_RESET_DELAY: Duration = Duration::from_millis(3000);

/// Position acquisition timeout (one-shot and continuous).
pub const ACQUISITION_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between continuous fixes from the simulated provider.
pub const SIMULATED_WATCH_INTERVAL: Duration = Duration::from_secs(2);

/// Artificial latency of a simulated one-shot fix.
pub const SIMULATED_FIX_DELAY: Duration = Duration::from_millis(300);

/// Where the simulated provider places the patient.
pub const DEMO_FIX: Location = Location {
    latitude: 47.3769,
    longitude: 8.5417,
    accuracy: 12.0,
};

/// Default bind address for the demo API server. Loopback only —
/// both views run in a browser tab on the same machine.
pub fn default_bind_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8750)
}

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    "info,medalert=debug"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_medalert() {
        assert_eq!(APP_NAME, "MedAlert");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn resolve_delay_shorter_than_reset_delay() {
        assert!(SEND_RESOLVE_DELAY < REJECTED_RESET_DELAY);
    }

    #[test]
    fn default_bind_is_loopback() {
        assert!(default_bind_addr().ip().is_loopback());
    }
}
