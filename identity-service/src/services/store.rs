//! Relational identity store seam.
//!
//! The store is an external collaborator: the identity service only ever
//! talks to this trait. `Database` is the PostgreSQL implementation;
//! `MemoryIdentityStore` backs the integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{NewStaffMember, RecoveryToken, StaffMember, StaffUpdate};
use crate::services::ServiceError;

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Lookup by normalized email among non-deleted staff members.
    async fn find_active_by_email(&self, email: &str)
        -> Result<Option<StaffMember>, ServiceError>;

    /// Lookup by id among non-deleted staff members.
    async fn find_active_by_id(&self, id: i64) -> Result<Option<StaffMember>, ServiceError>;

    /// Insert a new staff member, returning the stored row.
    async fn insert_staff(&self, new: NewStaffMember) -> Result<StaffMember, ServiceError>;

    /// Persist a fully-resolved profile update. A unique-constraint
    /// violation on email surfaces as `ServiceError::DuplicateEmail`.
    async fn update_profile(
        &self,
        id: i64,
        update: StaffUpdate,
    ) -> Result<StaffMember, ServiceError>;

    /// Replace the stored secret hash.
    async fn update_secret_hash(&self, id: i64, secret_hash: &str) -> Result<(), ServiceError>;

    async fn insert_recovery_token(
        &self,
        staff_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RecoveryToken, ServiceError>;

    async fn find_recovery_token(
        &self,
        token: &str,
    ) -> Result<Option<RecoveryToken>, ServiceError>;

    /// Atomically replace the owner's secret hash and delete the token.
    /// Fails with `ServiceError::InvalidToken` when the token row is
    /// already gone (redeemed concurrently).
    async fn redeem_recovery_token(
        &self,
        token_id: i64,
        staff_id: i64,
        secret_hash: &str,
    ) -> Result<(), ServiceError>;
}

/// In-memory store double for tests: same visibility and uniqueness rules
/// as the PostgreSQL implementation.
#[derive(Default)]
pub struct MemoryIdentityStore {
    inner: tokio::sync::Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    staff: Vec<StaffMember>,
    tokens: Vec<RecoveryToken>,
    next_staff_id: i64,
    next_token_id: i64,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw read of a stored hash, for asserting rotation behavior in tests.
    pub async fn secret_hash_of(&self, id: i64) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .staff
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.secret_hash.clone())
    }

    /// Soft-delete a staff member, for exercising deleted-subject paths.
    pub async fn soft_delete(&self, id: i64) {
        let mut inner = self.inner.lock().await;
        if let Some(staff) = inner.staff.iter_mut().find(|s| s.id == id) {
            staff.deleted_at = Some(Utc::now());
        }
    }

    pub async fn recovery_token_count(&self) -> usize {
        self.inner.lock().await.tokens.len()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_active_by_email(
        &self,
        email: &str,
    ) -> Result<Option<StaffMember>, ServiceError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .staff
            .iter()
            .find(|s| s.deleted_at.is_none() && s.email == email)
            .cloned())
    }

    async fn find_active_by_id(&self, id: i64) -> Result<Option<StaffMember>, ServiceError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .staff
            .iter()
            .find(|s| s.deleted_at.is_none() && s.id == id)
            .cloned())
    }

    async fn insert_staff(&self, new: NewStaffMember) -> Result<StaffMember, ServiceError> {
        let mut inner = self.inner.lock().await;
        if inner
            .staff
            .iter()
            .any(|s| s.deleted_at.is_none() && s.email == new.email)
        {
            return Err(ServiceError::DuplicateEmail);
        }

        inner.next_staff_id += 1;
        let now = Utc::now();
        let staff = StaffMember {
            id: inner.next_staff_id,
            first_name: new.first_name,
            last_name: new.last_name,
            display_name: new.display_name,
            email: new.email,
            secret_hash: new.secret_hash,
            phone: new.phone,
            sector: new.sector,
            functions: new.functions,
            photo_url: new.photo_url,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner.staff.push(staff.clone());
        Ok(staff)
    }

    async fn update_profile(
        &self,
        id: i64,
        update: StaffUpdate,
    ) -> Result<StaffMember, ServiceError> {
        let mut inner = self.inner.lock().await;
        if inner
            .staff
            .iter()
            .any(|s| s.deleted_at.is_none() && s.id != id && s.email == update.email)
        {
            return Err(ServiceError::DuplicateEmail);
        }

        let staff = inner
            .staff
            .iter_mut()
            .find(|s| s.deleted_at.is_none() && s.id == id)
            .ok_or(ServiceError::NotFound)?;

        staff.first_name = update.first_name;
        staff.last_name = update.last_name;
        staff.display_name = update.display_name;
        staff.email = update.email;
        staff.phone = update.phone;
        staff.sector = update.sector;
        staff.functions = update.functions;
        staff.updated_at = Utc::now();
        Ok(staff.clone())
    }

    async fn update_secret_hash(&self, id: i64, secret_hash: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        let staff = inner
            .staff
            .iter_mut()
            .find(|s| s.deleted_at.is_none() && s.id == id)
            .ok_or(ServiceError::NotFound)?;
        staff.secret_hash = secret_hash.to_string();
        staff.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_recovery_token(
        &self,
        staff_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RecoveryToken, ServiceError> {
        let mut inner = self.inner.lock().await;
        inner.next_token_id += 1;
        let record = RecoveryToken {
            id: inner.next_token_id,
            staff_id,
            token: token.to_string(),
            created_at: Utc::now(),
            expires_at,
        };
        inner.tokens.push(record.clone());
        Ok(record)
    }

    async fn find_recovery_token(
        &self,
        token: &str,
    ) -> Result<Option<RecoveryToken>, ServiceError> {
        let inner = self.inner.lock().await;
        Ok(inner.tokens.iter().find(|t| t.token == token).cloned())
    }

    async fn redeem_recovery_token(
        &self,
        token_id: i64,
        staff_id: i64,
        secret_hash: &str,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        let position = inner
            .tokens
            .iter()
            .position(|t| t.id == token_id)
            .ok_or(ServiceError::InvalidToken)?;
        inner.tokens.remove(position);

        let staff = inner
            .staff
            .iter_mut()
            .find(|s| s.deleted_at.is_none() && s.id == staff_id)
            .ok_or(ServiceError::InvalidIdentity)?;
        staff.secret_hash = secret_hash.to_string();
        staff.updated_at = Utc::now();
        Ok(())
    }
}
