//! SOS lifecycle endpoints. Each command answers with the fresh
//! snapshot so the calling view can re-render without a second fetch.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::controller::SosSnapshot;

/// `POST /api/sos/send` — raise an SOS. A no-op outside IDLE/REJECTED;
/// acquisition and resolution continue in the background, surfaced via
/// the WebSocket stream.
pub async fn send(
    State(ctx): State<ApiContext>,
) -> Result<Json<SosSnapshot>, ApiError> {
    Ok(Json(ctx.controller.send()?))
}

/// `POST /api/sos/accept` — doctor accepts the incoming alert.
pub async fn accept(
    State(ctx): State<ApiContext>,
) -> Result<Json<SosSnapshot>, ApiError> {
    Ok(Json(ctx.controller.accept()?))
}

/// `POST /api/sos/decline` — doctor declines; the alert is cleared and
/// tracking stops immediately.
pub async fn decline(
    State(ctx): State<ApiContext>,
) -> Result<Json<SosSnapshot>, ApiError> {
    Ok(Json(ctx.controller.decline()?))
}

/// `POST /api/sos/reset` — end the alert and return to idle.
pub async fn reset(
    State(ctx): State<ApiContext>,
) -> Result<Json<SosSnapshot>, ApiError> {
    Ok(Json(ctx.controller.reset()?))
}
