// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mail transports.
//!
//! [`Mailer`] is the seam the server talks to. Production uses
//! [`SmtpMailer`]; deployments with email disabled get [`NoopMailer`],
//! which logs what would have been sent and succeeds.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use nesach_config::model::EmailConfig;
use nesach_core::NesachError;
use tracing::{debug, info};

use crate::messages::EmailMessage;

/// Outbound transactional mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `message` to `to`. Callers treat failures as non-fatal and
    /// log them; a lost notification never aborts order processing.
    async fn send(&self, to: &str, message: &EmailMessage) -> Result<(), NesachError>;
}

/// SMTP transport built from [`EmailConfig`], STARTTLS on the relay port.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

// The transport holds SMTP credentials; show only the sender address.
impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, NesachError> {
        let from: Mailbox = config.from_address.parse().map_err(|e| NesachError::Email {
            message: format!("invalid from address {:?}: {e}", config.from_address),
            source: Some(Box::new(e)),
        })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| NesachError::Email {
                message: format!("failed to set up SMTP relay {:?}: {e}", config.smtp_host),
                source: Some(Box::new(e)),
            })?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, message: &EmailMessage) -> Result<(), NesachError> {
        let to: Mailbox = to.parse().map_err(|e| NesachError::Email {
            message: format!("invalid recipient address {to:?}: {e}"),
            source: Some(Box::new(e)),
        })?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to.clone())
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| NesachError::Email {
                message: format!("failed to build message: {e}"),
                source: Some(Box::new(e)),
            })?;

        self.transport.send(email).await.map_err(|e| NesachError::Email {
            message: format!("SMTP send failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        debug!(to = %to, subject = %message.subject, "email sent");
        Ok(())
    }
}

/// Logging stand-in used when `email.enabled` is false.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, message: &EmailMessage) -> Result<(), NesachError> {
        info!(to = %to, subject = %message.subject, "email disabled, skipping send");
        Ok(())
    }
}
