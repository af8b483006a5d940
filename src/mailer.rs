//! Outbound email for verification codes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;

/// Content of a verification email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailData {
    pub code: String,
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

/// Port for sending emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers `email` to `to`. Failures are reported, never retried here.
    async fn send(&self, to: &str, email: &EmailData) -> Result<(), AppError>;
}

#[derive(Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

/// Posts each message as JSON to a transactional mail relay.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            from: from.into(),
        }
    }
}

fn render_body(email: &EmailData) -> String {
    format!(
        "Your verification code is {}.\n\nIt expires at {}.",
        email.code,
        email.expires_at.format("%Y-%m-%d %H:%M UTC")
    )
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, email: &EmailData) -> Result<(), AppError> {
        let request = MailRequest {
            from: &self.from,
            to,
            subject: &email.subject,
            text: render_body(email),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Notification(format!(
                "mail relay answered {}",
                response.status()
            )));
        }

        log::debug!("verification email handed to relay");
        Ok(())
    }
}

/// Development mailer: writes the message to the log instead of sending it.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, email: &EmailData) -> Result<(), AppError> {
        log::info!(
            "[mail to {}] {}: {}",
            to,
            email.subject,
            render_body(email)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_body_contains_code_and_expiry() {
        let email = EmailData {
            code: "004213".to_string(),
            subject: "Email Verification".to_string(),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
        };

        let body = render_body(&email);
        assert!(body.contains("004213"));
        assert!(body.contains("2030-01-02 03:04 UTC"));
    }

    #[actix_rt::test]
    async fn test_log_mailer_always_succeeds() {
        let email = EmailData {
            code: "1234".to_string(),
            subject: "Email Verification".to_string(),
            expires_at: Utc::now(),
        };
        assert!(LogMailer.send("a@example.com", &email).await.is_ok());
    }
}
