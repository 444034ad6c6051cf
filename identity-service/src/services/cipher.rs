//! Transport payload cipher.
//!
//! Login and registration bodies may arrive as a single AES-256-GCM
//! envelope produced with the pre-shared key: base64(nonce || ciphertext),
//! 12-byte random nonce.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("ciphertext envelope is malformed")]
    Malformed,

    #[error("cryptographic operation failed")]
    Crypto,

    #[error("payload is not valid UTF-8")]
    Encoding,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct PayloadCipher {
    cipher: Aes256Gcm,
}

impl PayloadCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        let cipher = Aes256Gcm::new_from_slice(key).expect("key length is fixed at 32 bytes");
        Self { cipher }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::Crypto)?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(envelope))
    }

    pub fn decrypt(&self, payload: &str) -> Result<String, CipherError> {
        let envelope = BASE64
            .decode(payload.trim())
            .map_err(|_| CipherError::Malformed)?;
        if envelope.len() <= NONCE_LEN {
            return Err(CipherError::Malformed);
        }

        let (nonce_bytes, ciphertext) = envelope.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::Crypto)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Encoding)
    }

    pub fn encrypt_object<T: Serialize>(&self, value: &T) -> Result<String, CipherError> {
        let json = serde_json::to_string(value)?;
        self.encrypt(&json)
    }

    pub fn decrypt_object<T: DeserializeOwned>(&self, payload: &str) -> Result<T, CipherError> {
        let json = self.decrypt(payload)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn test_cipher() -> PayloadCipher {
        PayloadCipher::new(&[7u8; KEY_LEN])
    }

    #[test]
    fn test_round_trip_strings() {
        let cipher = test_cipher();
        for plaintext in ["", "hello", "coração açaí 🔐", "{\"a\":1}"] {
            let envelope = cipher.encrypt(plaintext).unwrap();
            assert_ne!(envelope, plaintext);
            assert_eq!(cipher.decrypt(&envelope).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_nonce_randomized() {
        let cipher = test_cipher();
        let a = cipher.encrypt("same input").unwrap();
        let b = cipher.encrypt("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_round_trip_objects() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Creds {
            email: String,
            password: String,
        }

        let cipher = test_cipher();
        let value = Creds {
            email: "ana@example.com".to_string(),
            password: "Str0ng!pass".to_string(),
        };

        let envelope = cipher.encrypt_object(&value).unwrap();
        let decoded: Creds = cipher.decrypt_object(&envelope).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        let cipher = test_cipher();
        assert!(matches!(
            cipher.decrypt("not base64 at all!!!"),
            Err(CipherError::Malformed)
        ));
        assert!(matches!(cipher.decrypt("YWJj"), Err(CipherError::Malformed)));
    }

    #[test]
    fn test_decrypt_rejects_tampering() {
        let cipher = test_cipher();
        let envelope = cipher.encrypt("sensitive").unwrap();
        let mut bytes = BASE64.decode(&envelope).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = BASE64.encode(bytes);
        assert!(matches!(cipher.decrypt(&tampered), Err(CipherError::Crypto)));
    }

    #[test]
    fn test_decrypt_rejects_wrong_key() {
        let envelope = test_cipher().encrypt("sensitive").unwrap();
        let other = PayloadCipher::new(&[9u8; KEY_LEN]);
        assert!(matches!(other.decrypt(&envelope), Err(CipherError::Crypto)));
    }
}
