//! Outbound email transport.
//!
//! Services depend on the [`Mailer`] trait only: hand it a rendered
//! [`OutgoingEmail`] and it reports which recipients the relay accepted.
//! [`SmtpMailer`] talks to a real relay via lettre; [`LogMailer`] writes
//! messages to the log for local development.

use async_trait::async_trait;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use mring_core::Email;

use crate::config::SmtpConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A fully rendered message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Email,
    pub subject: String,
    pub text: String,
    /// Sent as a `multipart/alternative` next to `text` when present.
    pub html: Option<String>,
}

/// Recipient outcome reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
}

impl Delivery {
    /// Every recipient in `to` accepted.
    #[must_use]
    pub fn all_accepted(to: &Email) -> Self {
        Self {
            accepted: vec![to.to_string()],
            rejected: Vec::new(),
        }
    }

    /// Whether the relay took the message for at least one recipient.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        !self.accepted.is_empty()
    }
}

/// Something that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Attempt delivery once. No retries.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` when the message cannot be built or the
    /// transport fails outright.
    async fn send(&self, email: OutgoingEmail) -> Result<Delivery, EmailError>;
}

/// SMTP relay transport.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// No connection is made until the first message is sent.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid or the username is not a
    /// usable sender address.
    pub fn new(config: &SmtpConfig, from_name: &str) -> Result<Self, EmailError> {
        let address = config
            .username
            .parse::<Address>()
            .map_err(|_| EmailError::InvalidAddress(config.username.clone()))?;

        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };
        let mailer = builder
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from: Mailbox::new(Some(from_name.to_string()), address),
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, EmailError> {
        let to = email
            .to
            .as_str()
            .parse::<Mailbox>()
            .map_err(|_| EmailError::InvalidAddress(email.to.to_string()))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str());

        let message = match &email.html {
            Some(html) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.clone()),
                    ),
            )?,
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(email.text.clone())?,
        };

        Ok(message)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<Delivery, EmailError> {
        let message = self.build_message(&email)?;
        let recipients: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(ToString::to_string)
            .collect();

        let response = self.mailer.send(message).await?;

        if response.is_positive() {
            tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
            Ok(Delivery {
                accepted: recipients,
                rejected: Vec::new(),
            })
        } else {
            tracing::warn!(
                to = %email.to,
                code = %response.code(),
                "SMTP relay did not accept the message"
            );
            Ok(Delivery {
                accepted: Vec::new(),
                rejected: recipients,
            })
        }
    }
}

/// Development transport that logs instead of sending.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<Delivery, EmailError> {
        tracing::warn!(
            to = %email.to,
            subject = %email.subject,
            body = %email.text,
            "SMTP not configured - email logged (dev mode)"
        );
        Ok(Delivery::all_accepted(&email.to))
    }
}
