//! Outgoing mail
//!
//! `Mailer` is the seam between handlers and mail delivery. The SMTP backend
//! talks to a relay through lettre; the console backend writes messages to the
//! log, which is what development setups use.

use crate::config::{MailBackend, MailConfig};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

/// Mail delivery errors
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("SMTP host not configured")]
    NotConfigured,

    #[error("Invalid address {0}: {1}")]
    InvalidAddress(String, String),

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("Failed to send email: {0}")]
    Transport(String),
}

/// A plain-text message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail delivery backend
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Build the backend selected in the mail config
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.backend {
        MailBackend::Console => Ok(Arc::new(ConsoleMailer)),
        MailBackend::Smtp => Ok(Arc::new(SmtpMailer::from_config(config)?)),
    }
}

/// Message recommending a post to someone else
pub fn share_mail(
    from: &str,
    to: &str,
    sender_name: &str,
    title: &str,
    post_url: &str,
    comments: &str,
) -> OutgoingMail {
    OutgoingMail {
        from: from.to_string(),
        to: to.to_string(),
        subject: format!("{} recommends you read {}", sender_name, title),
        body: format!(
            "Read {} at {}\n\n{}'s comments: {}",
            title, post_url, sender_name, comments
        ),
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| {
            MailError::InvalidAddress(address.to_string(), e.to_string())
        })
}

/// Convert to a lettre message
pub fn build_message(mail: &OutgoingMail) -> Result<Message, MailError> {
    Message::builder()
        .from(parse_mailbox(&mail.from)?)
        .to(parse_mailbox(&mail.to)?)
        .subject(mail.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(mail.body.clone())
        .map_err(|e| MailError::Build(e.to_string()))
}

/// SMTP relay backend
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        if config.smtp_host.trim().is_empty() {
            return Err(MailError::NotConfigured);
        }

        let builder = if config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        }
        .map_err(|e| MailError::Transport(e.to_string()))?
        .port(config.smtp_port);

        let builder = if config.smtp_username.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
        };

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = build_message(mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        tracing::info!(to = %mail.to, subject = %mail.subject, "Email sent");
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        build_message(mail)?;
        tracing::info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.body,
            "Email (console backend)"
        );
        Ok(())
    }
}

/// Keeps sent messages in memory; can be told to fail every delivery
#[cfg(test)]
#[derive(Default)]
pub struct MemoryMailer {
    pub sent: std::sync::Mutex<Vec<OutgoingMail>>,
    pub fail: bool,
}

#[cfg(test)]
#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_mail_text() {
        let mail = share_mail(
            "noreply@example.com",
            "friend@example.com",
            "Ann",
            "Hello Rust",
            "http://blog.example.com/1/hello-rust/",
            "Worth a look",
        );
        assert_eq!(mail.subject, "Ann recommends you read Hello Rust");
        assert_eq!(
            mail.body,
            "Read Hello Rust at http://blog.example.com/1/hello-rust/\n\nAnn's comments: Worth a look"
        );
        assert_eq!(mail.to, "friend@example.com");
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let mut mail = share_mail("noreply@example.com", "not an address", "A", "T", "u", "");
        assert!(matches!(
            build_message(&mail),
            Err(MailError::InvalidAddress(addr, _)) if addr == "not an address"
        ));

        mail.to = "friend@example.com".to_string();
        assert!(build_message(&mail).is_ok());
    }

    #[test]
    fn test_smtp_requires_host() {
        let config = MailConfig {
            backend: MailBackend::Smtp,
            ..MailConfig::default()
        };
        assert!(matches!(
            SmtpMailer::from_config(&config),
            Err(MailError::NotConfigured)
        ));
        assert!(build_mailer(&config).is_err());
        assert!(build_mailer(&MailConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_console_mailer_accepts_valid_mail() {
        let mail = share_mail("noreply@example.com", "friend@example.com", "A", "T", "u", "c");
        assert!(ConsoleMailer.send(&mail).await.is_ok());
    }

    #[tokio::test]
    async fn test_smtp_mailer_builds_without_connecting() {
        let config = MailConfig {
            backend: MailBackend::Smtp,
            smtp_host: "smtp.example.com".to_string(),
            smtp_username: "user".to_string(),
            smtp_password: "secret".to_string(),
            ..MailConfig::default()
        };
        assert!(SmtpMailer::from_config(&config).is_ok());
    }
}
