use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Newtype for the effective secret (password or federated provider id) to
/// prevent accidental logging.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(****)")
    }
}

/// Newtype for a stored secret hash.
#[derive(Debug, Clone)]
pub struct SecretHashString(String);

impl SecretHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Hash a secret using Argon2id with a random salt.
pub fn hash_secret(secret: &Secret) -> Result<SecretHashString, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let hash = argon2
        .hash_password(secret.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash secret: {}", e))?
        .to_string();

    Ok(SecretHashString::new(hash))
}

/// Verify a secret against a stored hash.
///
/// Returns Ok(()) on a match, Err otherwise.
pub fn verify_secret(secret: &Secret, hash: &SecretHashString) -> Result<(), anyhow::Error> {
    let parsed_hash = PasswordHash::new(hash.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid secret hash format: {}", e))?;

    Argon2::default()
        .verify_password(secret.as_str().as_bytes(), &parsed_hash)
        .map_err(|_| anyhow::anyhow!("Secret verification failed"))
}

/// Random unguessable recovery token value (32 bytes, hex-encoded).
pub fn generate_recovery_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; 32] = rng.gen();
    hex::encode(token_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_secret() {
        let secret = Secret::new("mySecurePassword123".to_string());
        let hash = hash_secret(&secret).expect("Failed to hash secret");

        assert!(!hash.as_str().is_empty());
        assert!(hash.as_str().starts_with("$argon2"));
    }

    #[test]
    fn test_verify_secret_correct() {
        let secret = Secret::new("mySecurePassword123".to_string());
        let hash = hash_secret(&secret).expect("Failed to hash secret");

        assert!(verify_secret(&secret, &hash).is_ok());
    }

    #[test]
    fn test_verify_secret_incorrect() {
        let secret = Secret::new("mySecurePassword123".to_string());
        let hash = hash_secret(&secret).expect("Failed to hash secret");

        let wrong = Secret::new("wrongPassword".to_string());
        assert!(verify_secret(&wrong, &hash).is_err());
    }

    #[test]
    fn test_different_hashes_for_same_secret() {
        let secret = Secret::new("mySecurePassword123".to_string());
        let hash1 = hash_secret(&secret).expect("Failed to hash secret");
        let hash2 = hash_secret(&secret).expect("Failed to hash secret");

        assert_ne!(hash1.as_str(), hash2.as_str());
        assert!(verify_secret(&secret, &hash1).is_ok());
        assert!(verify_secret(&secret, &hash2).is_ok());
    }

    #[test]
    fn test_recovery_token_shape() {
        let a = generate_recovery_token();
        let b = generate_recovery_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("hunter2!".to_string());
        assert_eq!(format!("{:?}", secret), "Secret(****)");
    }
}
