//! Outbound email seam.
//!
//! Verification and password-reset tokens leave the service through the
//! [`Mailer`] trait. The default implementation logs the payload instead of
//! sending real email; production deployments swap in an SMTP or API-backed
//! sender without touching the auth flows.

use anyhow::Result;
use serde_json::json;
use tracing::info;

/// A rendered outbound message. `payload_json` carries the template
/// variables, including the raw token.
#[derive(Clone, Debug)]
pub struct MailMessage {
    pub to_email: String,
    pub template: String,
    pub payload_json: String,
}

impl MailMessage {
    #[must_use]
    pub fn email_verification(to_email: &str, token: &str) -> Self {
        Self {
            to_email: to_email.to_string(),
            template: "email_verification".to_string(),
            payload_json: json!({ "token": token }).to_string(),
        }
    }

    #[must_use]
    pub fn password_reset(to_email: &str, token: &str) -> Self {
        Self {
            to_email: to_email.to_string(),
            template: "password_reset".to_string(),
            payload_json: json!({ "token": token }).to_string(),
        }
    }
}

/// Email delivery abstraction.
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error.
    fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &MailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            template = %message.template,
            payload = %message.payload_json,
            "email send stub"
        );
        Ok(())
    }
}
