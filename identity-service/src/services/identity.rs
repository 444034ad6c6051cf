//! Identity and session service: registration, login (both providers),
//! federated upsert-or-login, profile maintenance, and recovery-token
//! lifecycle.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::dtos::{
    FederatedAuthRequest, LoginRequest, RegisterRequest, SessionResponse, UpdateProfileRequest,
};
use crate::models::{
    normalize_email,
    staff::{display_name_for, StaffMember},
    Funcao, NewStaffMember, Provider, Setor, StaffProfile, StaffUpdate,
};
use crate::services::{policy, IdentityStore, JwtService, MailProvider, ServiceError};
use crate::utils::{generate_recovery_token, hash_secret, verify_secret, Secret, SecretHashString};

/// Sector assigned when a federated sign-in creates the account itself.
const FEDERATED_DEFAULT_SECTOR: Setor = Setor::Administrativo;

#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn IdentityStore>,
    mail: Arc<dyn MailProvider>,
    jwt: JwtService,
    recovery_ttl_minutes: i64,
    frontend_url: String,
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        mail: Arc<dyn MailProvider>,
        jwt: JwtService,
        recovery_ttl_minutes: i64,
        frontend_url: String,
    ) -> Self {
        Self {
            store,
            mail,
            jwt,
            recovery_ttl_minutes,
            frontend_url,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<SessionResponse, ServiceError> {
        let email = normalize_email(&req.email);
        let provider = req.provider.unwrap_or(Provider::Credentials);

        // The effective secret is the chosen password for the credentials
        // provider and the opaque provider id for the federated one; only
        // user-chosen passwords go through the policy.
        let effective_secret = match provider {
            Provider::Credentials => {
                let password = req
                    .password
                    .filter(|p| !p.is_empty())
                    .ok_or(ServiceError::MissingSecret)?;
                policy::validate_password(&password)?;
                password
            }
            Provider::Google => req
                .provider_id
                .or(req.password)
                .filter(|s| !s.is_empty())
                .ok_or(ServiceError::MissingSecret)?,
        };

        if self.store.find_active_by_email(&email).await?.is_some() {
            return Err(ServiceError::DuplicateEmail);
        }

        let secret_hash = hash_secret(&Secret::new(effective_secret))?;

        let functions = match req.functions {
            Some(functions) if functions.is_empty() => {
                return Err(ServiceError::Validation(
                    "At least one function is required".to_string(),
                ))
            }
            Some(functions) => functions,
            None => vec![Funcao::Colaborador],
        };

        let staff = self
            .store
            .insert_staff(NewStaffMember {
                display_name: display_name_for(&req.first_name, &req.last_name),
                first_name: req.first_name,
                last_name: req.last_name,
                email,
                secret_hash: secret_hash.into_string(),
                phone: req.phone,
                sector: req.sector,
                functions,
                photo_url: req.photo_url,
            })
            .await?;

        tracing::info!(staff_id = %staff.id, "Staff member registered");

        self.session_for(&staff)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<SessionResponse, ServiceError> {
        let email = normalize_email(&req.email);
        let provider = req.provider.unwrap_or(Provider::Credentials);

        // Same error for unknown email, missing secret, and hash mismatch:
        // the caller never learns whether the account exists.
        let staff = self
            .store
            .find_active_by_email(&email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let effective_secret = match provider {
            Provider::Credentials => req.password,
            Provider::Google => req.provider_id.or(req.password),
        }
        .filter(|s| !s.is_empty())
        .ok_or(ServiceError::InvalidCredentials)?;

        verify_secret(
            &Secret::new(effective_secret),
            &SecretHashString::new(staff.secret_hash.clone()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        tracing::info!(staff_id = %staff.id, "Staff member logged in");

        self.session_for(&staff)
    }

    /// Upsert-or-login from a verified federated callback. A provider id
    /// that no longer matches the stored hash replaces it: the identity
    /// provider is treated as the source of truth for this account.
    pub async fn federated_auth(
        &self,
        req: FederatedAuthRequest,
    ) -> Result<SessionResponse, ServiceError> {
        let email = normalize_email(&req.email);

        match self.store.find_active_by_email(&email).await? {
            Some(staff) => {
                let provider_secret = Secret::new(req.provider_id);
                let stored = SecretHashString::new(staff.secret_hash.clone());
                if verify_secret(&provider_secret, &stored).is_err() {
                    let rotated = hash_secret(&provider_secret)?;
                    self.store
                        .update_secret_hash(staff.id, rotated.as_str())
                        .await?;
                    tracing::warn!(staff_id = %staff.id, "Rotated stored hash to current federated provider id");
                }
                self.session_for(&staff)
            }
            None => {
                self.register(RegisterRequest {
                    first_name: req.first_name,
                    last_name: req.last_name,
                    email,
                    password: None,
                    phone: None,
                    sector: FEDERATED_DEFAULT_SECTOR,
                    functions: None,
                    provider: Some(Provider::Google),
                    provider_id: Some(req.provider_id),
                    photo_url: req.photo_url,
                })
                .await
            }
        }
    }

    pub async fn me(&self, staff_id: i64) -> Result<StaffProfile, ServiceError> {
        let staff = self
            .store
            .find_active_by_id(staff_id)
            .await?
            .ok_or(ServiceError::NotFound)?;
        Ok(staff.profile())
    }

    /// Always succeeds from the caller's perspective; an unknown email is a
    /// silent no-op so account existence never leaks.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), ServiceError> {
        let email = normalize_email(email);

        let Some(staff) = self.store.find_active_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_recovery_token();
        let expires_at = Utc::now() + Duration::minutes(self.recovery_ttl_minutes);
        self.store
            .insert_recovery_token(staff.id, &token, expires_at)
            .await?;

        let reset_link = format!(
            "{}/reset-password?token={}",
            self.frontend_url.trim_end_matches('/'),
            token
        );
        self.mail
            .send_password_recovery(&staff.email, &reset_link)
            .await?;

        tracing::info!(staff_id = %staff.id, "Password reset requested");
        Ok(())
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let record = self
            .store
            .find_recovery_token(token)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if record.is_expired() {
            return Err(ServiceError::ExpiredToken);
        }

        let staff = self
            .store
            .find_active_by_id(record.staff_id)
            .await?
            .ok_or(ServiceError::InvalidIdentity)?;

        if new_password.is_empty() {
            return Err(ServiceError::MissingSecret);
        }
        policy::validate_password(new_password)?;

        let secret_hash = hash_secret(&Secret::new(new_password.to_string()))?;

        // Hash swap and token deletion ride the same transaction so a crash
        // can never leave a redeemed-but-present token.
        self.store
            .redeem_recovery_token(record.id, staff.id, secret_hash.as_str())
            .await?;

        tracing::info!(staff_id = %staff.id, "Password reset completed");
        Ok(())
    }

    pub async fn update_profile(
        &self,
        staff_id: i64,
        req: UpdateProfileRequest,
    ) -> Result<StaffProfile, ServiceError> {
        let current = self
            .store
            .find_active_by_id(staff_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        // Uniqueness is re-checked only when the normalized email actually
        // changed, so updating the own record never self-conflicts.
        let email = match req.email {
            Some(email) => {
                let normalized = normalize_email(&email);
                if normalized != current.email
                    && self
                        .store
                        .find_active_by_email(&normalized)
                        .await?
                        .is_some()
                {
                    return Err(ServiceError::DuplicateEmail);
                }
                normalized
            }
            None => current.email.clone(),
        };

        let functions = match req.functions {
            Some(functions) if functions.is_empty() => {
                return Err(ServiceError::Validation(
                    "At least one function is required".to_string(),
                ))
            }
            Some(functions) => functions,
            None => current.functions.clone(),
        };

        let first_name = req.first_name.unwrap_or_else(|| current.first_name.clone());
        let last_name = req.last_name.unwrap_or_else(|| current.last_name.clone());

        let updated = self
            .store
            .update_profile(
                staff_id,
                StaffUpdate {
                    display_name: display_name_for(&first_name, &last_name),
                    first_name,
                    last_name,
                    email,
                    phone: req.phone.or(current.phone),
                    sector: req.sector.unwrap_or(current.sector),
                    functions,
                },
            )
            .await?;

        tracing::info!(staff_id = %updated.id, "Profile updated");
        Ok(updated.profile())
    }

    fn session_for(&self, staff: &StaffMember) -> Result<SessionResponse, ServiceError> {
        let session_token = self.jwt.issue(staff)?;
        Ok(SessionResponse {
            session_token,
            staff: staff.profile(),
        })
    }
}
