//! Doctor-side availability toggle.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::controller::SosSnapshot;

#[derive(Deserialize)]
pub struct AvailabilityBody {
    pub online: bool,
}

/// `POST /api/doctor/availability` — go online/offline. The flag is
/// read when a pending send resolves, not when it was raised.
pub async fn availability(
    State(ctx): State<ApiContext>,
    Json(body): Json<AvailabilityBody>,
) -> Result<Json<SosSnapshot>, ApiError> {
    Ok(Json(ctx.controller.set_doctor_online(body.online)?))
}
