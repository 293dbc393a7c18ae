/**
 * Mailer
 * SMTP delivery of contact form submissions
 */
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::SmtpConfig;

pub const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("smtp server did not accept the connection")]
    Unreachable,
}

/// A validated, sanitized contact form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
    pub ip: String,
    pub user_agent: String,
}

impl ContactMessage {
    pub fn subject(&self) -> String {
        format!("[Portfolio] Contact from {}", self.name)
    }

    pub fn text_body(&self, sent_at: &str) -> String {
        format!(
            "New Contact Form Submission\n\n\
             Name: {}\nEmail: {}\nIP Address: {}\nUser Agent: {}\n\n\
             Message:\n{}\n\n---\nSent: {}\n",
            self.name, self.email, self.ip, self.user_agent, self.message, sent_at
        )
    }

    /// HTML body with every user-supplied value escaped.
    pub fn html_body(&self, sent_at: &str) -> String {
        let esc = ammonia::clean_text;
        format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #0891b2;">New Contact Form Submission</h2>
  <p><strong>Name:</strong> {name}</p>
  <p><strong>Email:</strong> <a href="mailto:{email}">{email}</a></p>
  <p><strong>IP Address:</strong> {ip}</p>
  <p><strong>User Agent:</strong> {agent}</p>
  <h3>Message:</h3>
  <p style="white-space: pre-wrap;">{message}</p>
  <hr>
  <p style="color: #6b7280; font-size: 12px;">Sent from the portfolio contact form on {sent_at}</p>
</div>"#,
            name = esc(&self.name),
            email = esc(&self.email),
            ip = esc(&self.ip),
            agent = esc(&self.user_agent),
            message = esc(&self.message),
            sent_at = sent_at,
        )
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Check that the server accepts a connection and our credentials.
    async fn verify(&self) -> Result<(), MailError>;

    async fn send(&self, message: &ContactMessage) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from: config.from.parse()?,
            to: config.to.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn verify(&self) -> Result<(), MailError> {
        if self.transport.test_connection().await? {
            Ok(())
        } else {
            Err(MailError::Unreachable)
        }
    }

    async fn send(&self, message: &ContactMessage) -> Result<(), MailError> {
        let sent_at = chrono::Utc::now().to_rfc2822();
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(message.subject());
        if let Ok(reply_to) = message.email.parse::<Mailbox>() {
            builder = builder.reply_to(reply_to);
        }

        let email = builder.multipart(MultiPart::alternative_plain_html(
            message.text_body(&sent_at),
            message.html_body(&sent_at),
        ))?;

        let response = self.transport.send(email).await?;
        tracing::info!(
            code = %response.code(),
            from = %message.email,
            ip = %message.ip,
            "contact email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> ContactMessage {
        ContactMessage {
            name: "Jane O'Neil".to_string(),
            email: "jane@example.com".to_string(),
            message: "Hello & welcome \"friend\"".to_string(),
            ip: "203.0.113.9".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
        }
    }

    #[test]
    fn test_html_body_escapes_user_values() {
        let html = message().html_body("now");
        assert!(!html.contains("Hello & welcome"));
        assert!(!html.contains("\"friend\""));
        assert!(html.contains("&amp;"));
    }

    #[test]
    fn test_text_body_is_verbatim() {
        let text = message().text_body("now");
        assert!(text.contains("Hello & welcome \"friend\""));
        assert!(text.contains("IP Address: 203.0.113.9"));
    }

    #[test]
    fn test_subject() {
        assert_eq!(message().subject(), "[Portfolio] Contact from Jane O'Neil");
    }
}
