use axum::extract::{Json, State};
use validator::Validate;

use crate::dtos::UpdateProfileRequest;
use crate::middleware::AuthStaff;
use crate::models::StaffProfile;
use crate::AppState;
use service_core::error::AppError;

/// Current profile projection for the authenticated staff member.
///
/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    staff: AuthStaff,
) -> Result<Json<StaffProfile>, AppError> {
    let profile = state.identity.me(staff.staff_id).await?;
    Ok(Json(profile))
}

/// Update the authenticated staff member's profile. Only supplied fields
/// are persisted.
///
/// PUT /auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    staff: AuthStaff,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<StaffProfile>, AppError> {
    req.validate()?;

    let profile = state.identity.update_profile(staff.staff_id, req).await?;
    Ok(Json(profile))
}
