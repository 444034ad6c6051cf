use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::services::ServiceError;

#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn send_password_recovery(
        &self,
        to_email: &str,
        reset_link: &str,
    ) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Mail transport initialized");

        Ok(Self {
            mailer,
            from_email: config.from.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), ServiceError> {
        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| ServiceError::Internal(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| ServiceError::Internal(e.into()),
            )?)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| ServiceError::Internal(e.into()))?;

        // Send in the blocking pool to avoid stalling the async runtime.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e.to_string(), to = %to_email, "Failed to send email");
                Err(ServiceError::Mail(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl MailProvider for SmtpMailer {
    async fn send_password_recovery(
        &self,
        to_email: &str,
        reset_link: &str,
    ) -> Result<(), ServiceError> {
        let html_body = format!(
            r###"<html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>Password Reset Request</h2>
                    <p>We received a request to reset your password. Click the link below to set a new one:</p>
                    <p>
                        <a href="{}" style="background-color: #2196F3; color: white; padding: 14px 20px; text-decoration: none; border-radius: 4px;">
                            Reset Password
                        </a>
                    </p>
                    <p style="color: #666; font-size: 12px;">
                        This link will expire in 30 minutes. If you didn't request this, please ignore this email.
                    </p>
                </body>
            </html>
            "###,
            reset_link
        );

        let plain_body = format!(
            "Password Reset Request\n\nWe received a request to reset your password. Please visit the following link to set a new one:\n\n{}\n\nThis link will expire in 30 minutes. If you didn't request this, please ignore this email.",
            reset_link
        );

        self.send_email(to_email, "Reset Your Password", &plain_body, &html_body)
            .await
    }
}

/// Used when no SMTP transport is configured: recovery requests still
/// succeed, the link only reaches the logs.
#[derive(Clone, Default)]
pub struct NoopMailer;

#[async_trait]
impl MailProvider for NoopMailer {
    async fn send_password_recovery(
        &self,
        to_email: &str,
        reset_link: &str,
    ) -> Result<(), ServiceError> {
        tracing::debug!(to = %to_email, link = %reset_link, "Mail transport not configured; skipping delivery");
        Ok(())
    }
}
