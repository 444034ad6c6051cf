use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{services::SessionClaims, AppState};
use service_core::error::AppError;

/// Require a valid, unexpired bearer token. Claims and the parsed staff id
/// land in request extensions; the activity tracker sees every valid
/// request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state
        .jwt
        .validate(token)
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token")))?;

    let staff_id = claims
        .staff_id()
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid token subject")))?;

    state.activity.touch(staff_id);

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor for handlers behind `auth_middleware`.
pub struct AuthStaff {
    pub claims: SessionClaims,
    pub staff_id: i64,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthStaff
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<SessionClaims>()
            .cloned()
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Session claims missing from request extensions"
                ))
            })?;

        let staff_id = claims
            .staff_id()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid token subject")))?;

        Ok(AuthStaff { claims, staff_id })
    }
}
