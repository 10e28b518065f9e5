//! Demo API router.
//!
//! Returns a composable `Router` that can be mounted on any axum
//! server. Routes are nested under `/api/`; the WebSocket state
//! stream lives at `/ws/state`. CORS is permissive — the views are
//! served from a dev server on another local port.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::api::websocket;
use crate::controller::SosController;

/// Build the demo API router around a controller instance.
pub fn demo_api_router(controller: Arc<SosController>) -> Router {
    build_router(ApiContext::new(controller))
}

fn build_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/state", get(endpoints::session::state))
        .route("/profile", get(endpoints::session::profile))
        .route("/role", post(endpoints::session::switch_role))
        .route("/sos/send", post(endpoints::sos::send))
        .route("/sos/accept", post(endpoints::sos::accept))
        .route("/sos/decline", post(endpoints::sos::decline))
        .route("/sos/reset", post(endpoints::sos::reset))
        .route("/doctor/availability", post(endpoints::doctor::availability))
        .with_state(ctx.clone());

    let ws = Router::new()
        .route("/ws/state", get(websocket::ws_upgrade))
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .merge(ws)
        .layer(CorsLayer::permissive())
}
