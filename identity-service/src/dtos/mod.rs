pub mod auth;

pub use auth::{
    EncryptedPayload, FederatedAuthRequest, ForgotPasswordRequest, LoginRequest, MessageResponse,
    Payload, RegisterRequest, ResetPasswordRequest, SessionResponse, UpdateProfileRequest,
};
