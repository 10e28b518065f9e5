pub mod api;
pub mod config;
pub mod controller;
pub mod geolocation;
pub mod models;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::controller::SosController;
use crate::geolocation::SimulatedLocationProvider;
use crate::models::MedicalProfile;

/// Wire up the demo and serve until interrupted.
pub async fn run() -> Result<(), String> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("MedAlert starting v{}", config::APP_VERSION);

    let provider = Arc::new(SimulatedLocationProvider::demo());
    let controller = SosController::new(provider, MedicalProfile::demo());

    let mut server =
        api::start_api_server(Arc::clone(&controller), config::default_bind_addr())
            .await?;
    tracing::info!("Demo UI can connect at http://{}", server.addr);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {e}"))?;

    tracing::info!("Shutting down");
    // Guaranteed release: stop tracking regardless of current status.
    let _ = controller.reset();
    server.shutdown();
    Ok(())
}
