//! Session endpoints: current state, role switch, patient profile.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::controller::SosSnapshot;
use crate::models::{MedicalProfile, Role};

/// `GET /api/state` — the full view state.
pub async fn state(
    State(ctx): State<ApiContext>,
) -> Result<Json<SosSnapshot>, ApiError> {
    Ok(Json(ctx.controller.snapshot()?))
}

/// `GET /api/profile` — the patient's medical card.
pub async fn profile(State(ctx): State<ApiContext>) -> Json<MedicalProfile> {
    Json(ctx.controller.patient_profile().clone())
}

#[derive(Deserialize)]
pub struct SwitchRoleBody {
    pub role: Role,
}

/// `POST /api/role` — switch the active role. Implies a reset so no
/// alert survives the role change.
pub async fn switch_role(
    State(ctx): State<ApiContext>,
    Json(body): Json<SwitchRoleBody>,
) -> Result<Json<SosSnapshot>, ApiError> {
    Ok(Json(ctx.controller.switch_role(body.role)?))
}
