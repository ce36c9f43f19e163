//! Email delivery over authenticated SMTP.

use std::fmt;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::{Notifier, NotifyError, Report};

/// Port that speaks TLS from the first byte; every other port upgrades
/// with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// SMTP relay settings and credentials.
#[derive(Clone)]
pub struct MailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender: Mailbox,
    pub receiver: Mailbox,
    password: String,
}

impl MailConfig {
    /// Validate addresses and assemble the relay settings.
    pub fn new(
        smtp_server: impl Into<String>,
        smtp_port: u16,
        sender: &str,
        receiver: &str,
        password: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        Ok(Self {
            smtp_server: smtp_server.into(),
            smtp_port,
            sender: parse_mailbox(sender)?,
            receiver: parse_mailbox(receiver)?,
            password: password.into(),
        })
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("sender", &self.sender.to_string())
            .field("receiver", &self.receiver.to_string())
            .field("password", &"[redacted]")
            .finish()
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|source| NotifyError::Address {
            address: address.to_string(),
            source,
        })
}

/// Sends each report as one plain-text email.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    receiver: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
        }
        .map_err(NotifyError::Transport)?;

        let credentials = Credentials::new(
            config.sender.email.to_string(),
            config.password.clone(),
        );
        let transport = builder
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        debug!(server = %config.smtp_server, port = config.smtp_port, "SMTP transport configured");

        Ok(Self {
            transport,
            sender: config.sender.clone(),
            receiver: config.receiver.clone(),
        })
    }

    /// Build the email for a report.
    pub fn message(&self, report: &Report) -> Result<Message, NotifyError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(self.receiver.clone())
            .subject(report.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(report.body.clone())?;
        Ok(message)
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn notify(&self, report: &Report) -> Result<(), NotifyError> {
        let message = self.message(report)?;
        self.transport
            .send(message)
            .await
            .map_err(NotifyError::Send)?;
        info!(to = %self.receiver, subject = %report.subject, "email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailConfig {
        MailConfig::new(
            "smtp.example.com",
            587,
            "watcher@example.com",
            "me@example.com",
            "hunter2",
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let err = MailConfig::new(
            "smtp.example.com",
            587,
            "not an address",
            "me@example.com",
            "pw",
        )
        .unwrap_err();
        match err {
            NotifyError::Address { address, .. } => assert_eq!(address, "not an address"),
            other => panic!("expected address error, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", config());
        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_message_carries_subject_and_body() {
        let notifier = SmtpNotifier::new(&config()).unwrap();
        let report = Report {
            subject: "Acme Careers - NEW Job Listings".to_string(),
            body: "NEW OPENINGS (1):\n".to_string(),
            has_new: true,
        };

        let message = notifier.message(&report).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Subject: Acme Careers - NEW Job Listings"));
        assert!(formatted.contains("To: me@example.com"));
        assert!(formatted.contains("NEW OPENINGS (1):"));
    }
}
