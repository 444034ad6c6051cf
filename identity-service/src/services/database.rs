//! PostgreSQL implementation of the identity store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;

use crate::models::{NewStaffMember, RecoveryToken, StaffMember, StaffUpdate};
use crate::services::{IdentityStore, ServiceError};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// Raw staff row; enums travel as TEXT and are converted on the way out.
#[derive(Debug, FromRow)]
struct StaffRow {
    id: i64,
    first_name: String,
    last_name: String,
    display_name: String,
    email: String,
    secret_hash: String,
    phone: Option<String>,
    sector: String,
    functions: Vec<String>,
    photo_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<StaffRow> for StaffMember {
    type Error = ServiceError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        let sector = row
            .sector
            .parse()
            .map_err(|e: String| ServiceError::Internal(anyhow::anyhow!(e)))?;
        let functions = row
            .functions
            .iter()
            .map(|f| f.parse())
            .collect::<Result<Vec<_>, String>>()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?;

        Ok(StaffMember {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            display_name: row.display_name,
            email: row.email,
            secret_hash: row.secret_hash,
            phone: row.phone,
            sector,
            functions,
            photo_url: row.photo_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RecoveryTokenRow {
    id: i64,
    staff_id: i64,
    token: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<RecoveryTokenRow> for RecoveryToken {
    fn from(row: RecoveryTokenRow) -> Self {
        RecoveryToken {
            id: row.id,
            staff_id: row.staff_id,
            token: row.token,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}

fn functions_as_text(functions: &[crate::models::Funcao]) -> Vec<String> {
    functions.iter().map(|f| f.as_str().to_string()).collect()
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for Database {
    async fn find_active_by_email(
        &self,
        email: &str,
    ) -> Result<Option<StaffMember>, ServiceError> {
        let row = sqlx::query_as::<_, StaffRow>(
            "SELECT * FROM staff_members WHERE lower(email) = lower($1) AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StaffMember::try_from).transpose()
    }

    async fn find_active_by_id(&self, id: i64) -> Result<Option<StaffMember>, ServiceError> {
        let row = sqlx::query_as::<_, StaffRow>(
            "SELECT * FROM staff_members WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StaffMember::try_from).transpose()
    }

    async fn insert_staff(&self, new: NewStaffMember) -> Result<StaffMember, ServiceError> {
        let row = sqlx::query_as::<_, StaffRow>(
            r#"
            INSERT INTO staff_members
                (first_name, last_name, display_name, email, secret_hash, phone, sector, functions, photo_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.display_name)
        .bind(&new.email)
        .bind(&new.secret_hash)
        .bind(&new.phone)
        .bind(new.sector.as_str())
        .bind(functions_as_text(&new.functions))
        .bind(&new.photo_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::DuplicateEmail
            } else {
                ServiceError::Database(e)
            }
        })?;

        row.try_into()
    }

    async fn update_profile(
        &self,
        id: i64,
        update: StaffUpdate,
    ) -> Result<StaffMember, ServiceError> {
        let row = sqlx::query_as::<_, StaffRow>(
            r#"
            UPDATE staff_members
            SET first_name = $2,
                last_name = $3,
                display_name = $4,
                email = $5,
                phone = $6,
                sector = $7,
                functions = $8,
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.display_name)
        .bind(&update.email)
        .bind(&update.phone)
        .bind(update.sector.as_str())
        .bind(functions_as_text(&update.functions))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::DuplicateEmail
            } else {
                ServiceError::Database(e)
            }
        })?;

        row.ok_or(ServiceError::NotFound)?.try_into()
    }

    async fn update_secret_hash(&self, id: i64, secret_hash: &str) -> Result<(), ServiceError> {
        let result = sqlx::query(
            "UPDATE staff_members SET secret_hash = $2, updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(secret_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    async fn insert_recovery_token(
        &self,
        staff_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RecoveryToken, ServiceError> {
        let row = sqlx::query_as::<_, RecoveryTokenRow>(
            r#"
            INSERT INTO recovery_tokens (staff_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(staff_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_recovery_token(
        &self,
        token: &str,
    ) -> Result<Option<RecoveryToken>, ServiceError> {
        let row = sqlx::query_as::<_, RecoveryTokenRow>(
            "SELECT * FROM recovery_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RecoveryToken::from))
    }

    async fn redeem_recovery_token(
        &self,
        token_id: i64,
        staff_id: i64,
        secret_hash: &str,
    ) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        // Delete first: zero rows affected means another redemption won.
        let deleted = sqlx::query("DELETE FROM recovery_tokens WHERE id = $1")
            .bind(token_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(ServiceError::InvalidToken);
        }

        let updated = sqlx::query(
            "UPDATE staff_members SET secret_hash = $2, updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(staff_id)
        .bind(secret_hash)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ServiceError::InvalidIdentity);
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Funcao, Setor};

    #[test]
    fn test_staff_row_conversion() {
        let now = Utc::now();
        let row = StaffRow {
            id: 7,
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
            display_name: "Ana Silva".to_string(),
            email: "ana@example.com".to_string(),
            secret_hash: "$argon2id$test".to_string(),
            phone: Some("+55 11 99999-0000".to_string()),
            sector: "FINANCEIRO".to_string(),
            functions: vec!["COLABORADOR".to_string(), "LIDER_EVENTOS".to_string()],
            photo_url: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let staff = StaffMember::try_from(row).unwrap();
        assert_eq!(staff.sector, Setor::Financeiro);
        assert_eq!(
            staff.functions,
            vec![Funcao::Colaborador, Funcao::LiderEventos]
        );
    }

    #[test]
    fn test_staff_row_conversion_rejects_unknown_function() {
        let now = Utc::now();
        let row = StaffRow {
            id: 7,
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
            display_name: "Ana Silva".to_string(),
            email: "ana@example.com".to_string(),
            secret_hash: "$argon2id$test".to_string(),
            phone: None,
            sector: "FINANCEIRO".to_string(),
            functions: vec!["GERENTE".to_string()],
            photo_url: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        assert!(StaffMember::try_from(row).is_err());
    }
}
