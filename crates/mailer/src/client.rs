use lettre::{
    message::{MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, instrument};
use transport_core::{async_trait, EmailMessage, EmailTransport, TransportError, TransportReceipt};

use crate::{MailerError, SmtpConfig, SmtpSecurity};

/// Client for sending emails through an SMTP relay.
///
/// Uses connection pooling for efficient batch sending.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_header: String,
}

impl SmtpMailer {
    /// Create a new client with the given configuration.
    pub fn new(config: SmtpConfig) -> Result<Self, MailerError> {
        let builder = match config.security {
            SmtpSecurity::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| MailerError::Transport(e.to_string()))?,
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| MailerError::Transport(e.to_string()))?,
            SmtpSecurity::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host),
        };

        let mut builder = builder.port(config.smtp_port);
        if let (Some(username), Some(password)) = (&config.username, config.password()) {
            builder = builder.credentials(Credentials::new(username.clone(), password.to_string()));
        }

        info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            security = ?config.security,
            "Created SMTP client"
        );

        Ok(Self {
            transport: builder.build(),
            from_header: config.from_header(),
        })
    }

    /// Send an email.
    #[instrument(skip(self, email), fields(to = %email.to, subject = %email.subject))]
    pub async fn send(&self, email: &EmailMessage) -> Result<serde_json::Value, MailerError> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailerError::Send(e.to_string()))?;

        info!(to = %email.to, subject = %email.subject, "Email sent successfully");

        Ok(serde_json::json!({
            "transport": "smtp",
            "code": response.code().to_string(),
            "message": response.message().collect::<Vec<_>>().join(" "),
        }))
    }

    /// Build a lettre Message from an outgoing email.
    fn build_message(&self, email: &EmailMessage) -> Result<Message, MailerError> {
        let from = self
            .from_header
            .parse()
            .map_err(|e| MailerError::InvalidAddress(format!("From: {}", e)))?;

        let to = email
            .to
            .parse()
            .map_err(|e| MailerError::InvalidAddress(format!("To '{}': {}", email.to, e)))?;

        let builder = Message::builder().from(from).to(to).subject(&email.subject);

        let message = if let Some(html) = &email.html {
            // Multipart alternative: text + HTML
            builder
                .multipart(
                    MultiPart::alternative()
                        .singlepart(SinglePart::plain(email.text.clone()))
                        .singlepart(SinglePart::html(html.clone())),
                )
                .map_err(|e| MailerError::BuildEmail(e.to_string()))?
        } else {
            builder
                .body(email.text.clone())
                .map_err(|e| MailerError::BuildEmail(e.to_string()))?
        };

        Ok(message)
    }
}

#[async_trait]
impl EmailTransport for SmtpMailer {
    async fn send_email(&self, message: &EmailMessage) -> Result<TransportReceipt, TransportError> {
        let response = self.send(message).await?;
        Ok(TransportReceipt::new(response))
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> SmtpMailer {
        let config = SmtpConfig::new("localhost", 1025, "alerts@example.com")
            .with_security(SmtpSecurity::None)
            .with_from_name("Tracker");
        SmtpMailer::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_build_plain_message() {
        let email = EmailMessage::new("admin@example.com", "Alert", "Body text");
        let message = mailer().build_message(&email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("To: admin@example.com"));
        assert!(raw.contains("Subject: Alert"));
        assert!(raw.contains("From: Tracker <alerts@example.com>"));
    }

    #[tokio::test]
    async fn test_build_html_message() {
        let email = EmailMessage::new("admin@example.com", "Alert", "Body text").with_html("<p>Body</p>");
        let message = mailer().build_message(&email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("multipart/alternative"));
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let email = EmailMessage::new("not-an-address", "Alert", "Body");
        let err = mailer().build_message(&email).unwrap_err();
        assert!(matches!(err, MailerError::InvalidAddress(_)));

        let transport_err: TransportError = err.into();
        assert!(matches!(transport_err, TransportError::InvalidRecipient(_)));
    }
}
