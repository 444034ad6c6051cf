pub mod password;

pub use password::{
    generate_recovery_token, hash_secret, verify_secret, Secret, SecretHashString,
};
