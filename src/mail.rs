//! Outgoing mail over SMTP.
//!
//! Without SMTP settings the mailer only logs what it would have sent, so
//! development setups work without a relay.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// A plain-text mail.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailBody {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
}

impl MailBody {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self { to: Some(to.into()), subject: Some(subject.into()), text: Some(text.into()) }
    }

    /// Every field must be present and non-blank.
    pub fn validate(&self) -> Result<(&str, &str, &str), AppError> {
        let field = |v: &Option<String>, name: &str| -> Result<(), AppError> {
            match v.as_deref().map(str::trim) {
                Some(s) if !s.is_empty() => Ok(()),
                _ => Err(AppError::not_null(format!("Mail {name} must be not null"))),
            }
        };
        field(&self.to, "recipient")?;
        field(&self.subject, "subject")?;
        field(&self.text, "text")?;
        Ok((
            self.to.as_deref().unwrap_or_default(),
            self.subject.as_deref().unwrap_or_default(),
            self.text.as_deref().unwrap_or_default(),
        ))
    }
}

#[derive(Clone)]
enum Transport {
    Smtp { mailer: AsyncSmtpTransport<Tokio1Executor>, from_address: String },
    Log,
}

#[derive(Clone)]
pub struct Mailer { transport: Transport }

impl Mailer {
    /// Create a mailer; `None` yields one that only logs.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: Option<&SmtpConfig>) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            return Ok(Self::log_only());
        };
        let credentials = Credentials::new(config.username.clone(), config.password.expose_secret().to_string());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();
        Ok(Self { transport: Transport::Smtp { mailer, from_address: config.from_address.clone() } })
    }

    pub fn log_only() -> Self { Self { transport: Transport::Log } }

    pub async fn send_simple_mail(&self, body: &MailBody) -> Result<(), AppError> {
        let (to, subject, text) = body.validate()?;
        self.deliver(to, subject, text).await.map_err(|e| {
            tracing::error!(error = %e, %to, "Failed to send mail");
            AppError::system("Error when sending mail")
        })
    }

    async fn deliver(&self, to: &str, subject: &str, text: &str) -> Result<(), MailError> {
        match &self.transport {
            Transport::Log => {
                tracing::info!(%to, %subject, "SMTP not configured, mail not sent");
                tracing::debug!(%to, %text, "Unsent mail body");
                Ok(())
            }
            Transport::Smtp { mailer, from_address } => {
                let email = Message::builder()
                    .from(from_address.parse().map_err(|_| MailError::InvalidAddress(from_address.clone()))?)
                    .to(to.parse().map_err(|_| MailError::InvalidAddress(to.to_string()))?)
                    .subject(subject)
                    .header(ContentType::TEXT_PLAIN)
                    .body(text.to_string())?;
                mailer.send(email).await?;
                tracing::info!(%to, %subject, "Email sent successfully");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::codes;

    #[test]
    fn blank_fields_are_rejected() {
        let body = MailBody { to: Some("a@b.vn".into()), subject: Some("  ".into()), text: Some("hi".into()) };
        let err = body.validate().unwrap_err();
        assert_eq!(err.code(), codes::FIELD_NOT_NULL);
        assert_eq!(err.to_string(), "Mail subject must be not null");
        assert!(MailBody::default().validate().is_err());
    }

    #[tokio::test]
    async fn log_only_mailer_accepts_mail() {
        Mailer::new(None).unwrap().send_simple_mail(&MailBody::new("a@b.vn", "OTP", "123456")).await.unwrap();
    }
}
