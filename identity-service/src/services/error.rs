use crate::services::cipher::CipherError;
use crate::services::policy::PasswordPolicyError;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    WeakSecret(#[from] PasswordPolicyError),

    #[error("Secret is required")]
    MissingSecret,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Staff member no longer exists")]
    InvalidIdentity,

    #[error("Staff member not found")]
    NotFound,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient privileges")]
    Forbidden,

    #[error("Invalid encrypted payload")]
    Decryption(#[source] CipherError),

    #[error("{0} is not configured")]
    FeatureDisabled(&'static str),

    #[error("Email error: {0}")]
    Mail(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::WeakSecret(e) => AppError::BadRequest(anyhow::anyhow!(e.to_string())),
            ServiceError::MissingSecret => {
                AppError::BadRequest(anyhow::anyhow!("Secret is required"))
            }
            ServiceError::DuplicateEmail => {
                AppError::Conflict(anyhow::anyhow!("Email already registered"))
            }
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::InvalidToken => AppError::BadRequest(anyhow::anyhow!("Invalid token")),
            ServiceError::ExpiredToken => AppError::BadRequest(anyhow::anyhow!("Token expired")),
            ServiceError::InvalidIdentity => {
                AppError::NotFound(anyhow::anyhow!("Staff member no longer exists"))
            }
            ServiceError::NotFound => AppError::NotFound(anyhow::anyhow!("Staff member not found")),
            ServiceError::Unauthenticated => {
                AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
            }
            ServiceError::Forbidden => {
                AppError::Forbidden(anyhow::anyhow!("Insufficient privileges"))
            }
            // Never leak cipher internals to the caller.
            ServiceError::Decryption(_) => {
                AppError::BadRequest(anyhow::anyhow!("Invalid encrypted payload"))
            }
            ServiceError::FeatureDisabled(feature) => {
                AppError::ServiceUnavailable(format!("{} is not configured", feature))
            }
            ServiceError::Mail(e) => AppError::EmailError(e),
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
