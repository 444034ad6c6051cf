//! Request/response DTOs for the identity endpoints.
//!
//! Registration and login accept either the plain structured body or a
//! single `encryptedData` envelope; `Payload<T>` resolves both shapes to
//! the same `T` before anything reaches the service layer.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidationError};

use crate::models::{Funcao, Provider, Setor, StaffProfile};
use crate::services::{PayloadCipher, ServiceError};

/// Email format check tolerant of surrounding whitespace; the service
/// normalizes (trims, lower-cases) before any lookup or comparison.
fn email_format(value: &str) -> Result<(), ValidationError> {
    if value.trim().validate_email() {
        Ok(())
    } else {
        let mut err = ValidationError::new("email");
        err.message = Some("Invalid email format".into());
        Err(err)
    }
}

/// Plain-or-encrypted request body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Payload<T> {
    Encrypted(EncryptedPayload),
    Plain(T),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    pub encrypted_data: String,
}

impl<T: DeserializeOwned> Payload<T> {
    /// Resolve to the structured body, decrypting when needed. Both paths
    /// must produce identical downstream outcomes.
    pub fn resolve(self, cipher: &PayloadCipher) -> Result<T, ServiceError> {
        match self {
            Payload::Plain(body) => Ok(body),
            Payload::Encrypted(envelope) => cipher
                .decrypt_object(&envelope.encrypted_data)
                .map_err(ServiceError::Decryption),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(custom(function = "email_format"))]
    pub email: String,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub sector: Setor,
    pub functions: Option<Vec<Funcao>>,
    pub provider: Option<Provider>,
    pub provider_id: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(custom(function = "email_format"))]
    pub email: String,
    pub password: Option<String>,
    pub provider: Option<Provider>,
    pub provider_id: Option<String>,
}

/// Input assembled from a verified federated-identity callback.
#[derive(Debug, Clone)]
pub struct FederatedAuthRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub provider_id: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(custom(function = "email_format"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(custom(function = "email_format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub sector: Option<Setor>,
    pub functions: Option<Vec<Funcao>>,
}

/// Session token plus the authenticated staff member's projection.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_token: String,
    pub staff: StaffProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
