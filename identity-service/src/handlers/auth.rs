use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use validator::Validate;

use crate::dtos::{
    ForgotPasswordRequest, LoginRequest, MessageResponse, Payload, RegisterRequest,
    ResetPasswordRequest, SessionResponse,
};
use crate::models::{Funcao, Setor};
use crate::AppState;
use service_core::error::AppError;

/// Register a new staff member.
///
/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Payload<RegisterRequest>>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let req = payload.resolve(&state.cipher)?;
    req.validate()?;

    let session = state.identity.register(req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Login with email and secret.
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Payload<LoginRequest>>,
) -> Result<Json<SessionResponse>, AppError> {
    let req = payload.resolve(&state.cipher)?;
    req.validate()?;

    let session = state.identity.login(req).await?;
    Ok(Json(session))
}

/// Request a password-recovery link. Responds identically whether or not
/// the email belongs to an account.
///
/// POST /auth/forgot
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()?;

    state.identity.request_password_reset(&req.email).await?;
    Ok(Json(MessageResponse {
        message: "If the email is registered, a recovery link has been sent.".to_string(),
    }))
}

/// Redeem a recovery token and set a new password.
///
/// POST /auth/reset
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()?;

    state.identity.reset_password(&req.token, &req.password).await?;
    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}

/// GET /auth/setores
pub async fn list_sectors() -> Json<Vec<&'static str>> {
    Json(Setor::ALL.iter().map(Setor::as_str).collect())
}

/// GET /auth/funcoes
pub async fn list_functions() -> Json<Vec<&'static str>> {
    Json(Funcao::ALL.iter().map(Funcao::as_str).collect())
}
