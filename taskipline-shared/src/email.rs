/// Outbound email
///
/// Transactional mail (verification links, password reset links, lifecycle
/// notices) is sent through the Resend HTTP API. The `Mailer` trait is the
/// seam: handlers hold an `Arc<dyn Mailer>` so tests swap in `NoopMailer`
/// and never touch the network.
///
/// Email delivery is best-effort. Callers log failures and carry on; a
/// down mail provider must never fail a signup or a password reset.

use async_trait::async_trait;
use serde::Serialize;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Errors from sending email
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// HTTP transport failure
    #[error("email request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider rejected the message
    #[error("email provider returned {status}: {body}")]
    Provider { status: u16, body: String },
}

/// A single outbound message
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Sends transactional email
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// Mailer backed by the Resend HTTP API
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&ResendRequest {
                from: &self.from,
                to: [&message.to],
                subject: &message.subject,
                html: &message.html,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to = %message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}

/// Mailer that drops every message, for tests and local development
#[derive(Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        tracing::debug!(to = %message.to, subject = %message.subject, "email suppressed");
        Ok(())
    }
}

/// Message builders for each transactional email the service sends.
pub mod messages {
    use super::EmailMessage;

    /// Email verification link sent on signup and on resend requests.
    pub fn verification(to: &str, first_name: &str, verify_url: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Verify your Taskipline account".to_string(),
            html: format!(
                "<p>Hi {first_name},</p>\
                 <p>Welcome to Taskipline! Click the link below to verify your email \
                 address. The link expires shortly, so don't wait too long.</p>\
                 <p><a href=\"{verify_url}\">Verify my email</a></p>\
                 <p>If you didn't create an account, you can ignore this email.</p>"
            ),
        }
    }

    /// Welcome note sent once verification succeeds.
    pub fn welcome(to: &str, first_name: &str, app_url: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Welcome to Taskipline".to_string(),
            html: format!(
                "<p>Hi {first_name},</p>\
                 <p>Your email is verified and your account is ready. \
                 <a href=\"{app_url}\">Sign in</a> and set your first goal.</p>"
            ),
        }
    }

    /// Password reset link.
    pub fn password_reset(to: &str, first_name: &str, reset_url: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Reset your Taskipline password".to_string(),
            html: format!(
                "<p>Hi {first_name},</p>\
                 <p>We received a request to reset your password. Click the link \
                 below to choose a new one. The link expires shortly.</p>\
                 <p><a href=\"{reset_url}\">Reset my password</a></p>\
                 <p>If you didn't request this, you can ignore this email; your \
                 password has not changed.</p>"
            ),
        }
    }

    /// Confirmation sent after a successful password reset.
    pub fn password_reset_success(to: &str, first_name: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Your Taskipline password was changed".to_string(),
            html: format!(
                "<p>Hi {first_name},</p>\
                 <p>Your password was just changed. If this wasn't you, reset your \
                 password again immediately.</p>"
            ),
        }
    }

    /// Farewell sent when an account is deleted.
    pub fn account_deleted(to: &str, first_name: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Your Taskipline account has been deleted".to_string(),
            html: format!(
                "<p>Hi {first_name},</p>\
                 <p>Your account and all of its data have been deleted. \
                 We're sorry to see you go.</p>"
            ),
        }
    }
}
