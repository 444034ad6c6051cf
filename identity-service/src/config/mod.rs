use service_core::config::{get_env, get_env_opt, Environment};
use service_core::error::AppError;

use crate::services::cipher::KEY_LEN;

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    /// Pre-shared transport cipher key. Required in every environment;
    /// the process refuses to boot without it.
    pub cipher_key: [u8; KEY_LEN],
    pub recovery_token_ttl_minutes: i64,
    pub idle_window_minutes: u64,
    pub frontend_url: String,
    /// Absent config disables the federated flow without touching the rest
    /// of the service.
    pub google: Option<GoogleOAuthConfig>,
    /// Absent config degrades recovery mail to a logged link.
    pub smtp: Option<SmtpConfig>,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub register_attempts: u32,
    pub register_window_seconds: u64,
    pub forgot_attempts: u32,
    pub forgot_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let environment = Environment::from_env()?;
        let is_prod = environment.is_prod();

        let config = IdentityConfig {
            service_name: get_env("SERVICE_NAME", Some("identity-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            port: get_env("PORT", Some("8080"), is_prod)?
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                })?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .unwrap_or(1),
            },
            session: SessionConfig {
                secret: get_env("SESSION_SECRET", None, is_prod)?,
                ttl_hours: get_env("SESSION_TTL_HOURS", Some("24"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            cipher_key: parse_cipher_key(&get_env("PAYLOAD_CIPHER_KEY", None, is_prod)?)?,
            recovery_token_ttl_minutes: get_env("RECOVERY_TOKEN_TTL_MINUTES", Some("30"), is_prod)?
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                })?,
            idle_window_minutes: get_env("IDLE_WINDOW_MINUTES", Some("15"), is_prod)?
                .parse()
                .unwrap_or(15),
            frontend_url: get_env("FRONTEND_URL", Some("http://localhost:3000"), is_prod)?,
            google: match get_env_opt("GOOGLE_CLIENT_ID") {
                Some(client_id) => Some(GoogleOAuthConfig {
                    client_id,
                    client_secret: get_env("GOOGLE_CLIENT_SECRET", None, is_prod)?,
                    redirect_uri: get_env("GOOGLE_REDIRECT_URI", None, is_prod)?,
                }),
                None => None,
            },
            smtp: match get_env_opt("SMTP_HOST") {
                Some(host) => {
                    let user = get_env("SMTP_USER", None, is_prod)?;
                    Some(SmtpConfig {
                        host,
                        from: get_env("SMTP_FROM", Some(&user), is_prod)?,
                        password: get_env("SMTP_PASSWORD", None, is_prod)?,
                        user,
                    })
                }
                None => None,
            },
            rate_limit: RateLimitConfig {
                login_attempts: get_env("RATE_LIMIT_LOGIN_ATTEMPTS", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                login_window_seconds: get_env(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    Some("900"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(900),
                register_attempts: get_env("RATE_LIMIT_REGISTER_ATTEMPTS", Some("3"), is_prod)?
                    .parse()
                    .unwrap_or(3),
                register_window_seconds: get_env(
                    "RATE_LIMIT_REGISTER_WINDOW_SECONDS",
                    Some("3600"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(3600),
                forgot_attempts: get_env("RATE_LIMIT_FORGOT_ATTEMPTS", Some("3"), is_prod)?
                    .parse()
                    .unwrap_or(3),
                forgot_window_seconds: get_env(
                    "RATE_LIMIT_FORGOT_WINDOW_SECONDS",
                    Some("3600"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(3600),
                global_ip_limit: get_env("RATE_LIMIT_GLOBAL_IP_LIMIT", Some("100"), is_prod)?
                    .parse()
                    .unwrap_or(100),
                global_ip_window_seconds: get_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(60),
            },
            environment,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.session.ttl_hours <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_TTL_HOURS must be positive"
            )));
        }

        if self.recovery_token_ttl_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RECOVERY_TOKEN_TTL_MINUTES must be positive"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS must not exceed DATABASE_MAX_CONNECTIONS"
            )));
        }

        Ok(())
    }
}

/// The cipher key arrives as 64 hex characters (32 bytes).
fn parse_cipher_key(value: &str) -> Result<[u8; KEY_LEN], AppError> {
    let bytes = hex::decode(value.trim()).map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!(
            "PAYLOAD_CIPHER_KEY must be hex-encoded"
        ))
    })?;

    bytes.try_into().map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!(
            "PAYLOAD_CIPHER_KEY must decode to exactly {} bytes",
            KEY_LEN
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cipher_key_valid() {
        let key = "ab".repeat(KEY_LEN);
        assert_eq!(parse_cipher_key(&key).unwrap(), [0xabu8; KEY_LEN]);
    }

    #[test]
    fn test_parse_cipher_key_rejects_wrong_length() {
        assert!(parse_cipher_key("abcdef").is_err());
    }

    #[test]
    fn test_parse_cipher_key_rejects_non_hex() {
        let key = "zz".repeat(KEY_LEN);
        assert!(parse_cipher_key(&key).is_err());
    }
}
