use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::StaffMember;

/// Signed, stateless session token service. Validity is entirely determined
/// by signature and expiry; there is no server-side session store.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_hours: i64,
}

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (staff member id, stringified)
    pub sub: String,
    /// Email at issuance time
    pub email: String,
    /// Display name at issuance time
    pub name: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl SessionClaims {
    /// Parse the subject back into a staff member id.
    pub fn staff_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

impl JwtService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }

    /// Issue a session token for a staff member.
    pub fn issue(&self, staff: &StaffMember) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.ttl_hours);

        let claims = SessionClaims {
            sub: staff.id.to_string(),
            email: staff.email.clone(),
            name: staff.display_name.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))?;

        Ok(token)
    }

    /// Validate signature and expiry, returning the embedded claims.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid session token: {}", e))?;

        Ok(token_data.claims)
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.ttl_hours * 3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Funcao, Setor};

    fn sample_staff() -> StaffMember {
        let now = Utc::now();
        StaffMember {
            id: 42,
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
            display_name: "Ana Silva".to_string(),
            email: "ana@example.com".to_string(),
            secret_hash: "$argon2id$test".to_string(),
            phone: None,
            sector: Setor::Financeiro,
            functions: vec![Funcao::Colaborador],
            photo_url: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let jwt = JwtService::new("test-secret", 24);
        let token = jwt.issue(&sample_staff()).unwrap();
        assert!(!token.is_empty());

        let claims = jwt.validate(&token).unwrap();
        assert_eq!(claims.staff_id(), Some(42));
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.name, "Ana Silva");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_validate_rejects_wrong_secret() {
        let token = JwtService::new("secret-a", 24).issue(&sample_staff()).unwrap();
        assert!(JwtService::new("secret-b", 24).validate(&token).is_err());
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let jwt = JwtService::new("test-secret", 24);
        assert!(jwt.validate("not.a.token").is_err());
    }
}
