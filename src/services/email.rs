//! Outgoing mail (password reset links)

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// Sends account mails; mocked in service tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, name: &str, reset_link: &str) -> AppResult<()>;
}

/// SMTP mailer
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

pub(crate) fn password_reset_body(name: &str, reset_link: &str) -> String {
    format!(
        r#"Hello {name},

Someone asked to reset the password of your GameLend account.
Open the link below to choose a new password:

{link}

If you did not ask for this, you can ignore this email.
"#,
        name = name,
        link = reset_link
    )
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> AppResult<Message> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("GameLend");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                "<html><body><p>{}</p></body></html>",
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }

    fn transport(&self) -> AppResult<SmtpTransport> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(builder.build())
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let email = self.build_message(to, subject, body)?;
        let mailer = self.transport()?;

        // SmtpTransport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send_password_reset(&self, to: &str, name: &str, reset_link: &str) -> AppResult<()> {
        if !self.config.enabled {
            tracing::debug!("Email disabled, password reset link for {}: {}", to, reset_link);
            return Ok(());
        }

        self.send_email(to, "Reset your GameLend password", &password_reset_body(name, reset_link))
            .await?;
        tracing::info!("Password reset email sent to {}", to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_body_contains_link() {
        let body = password_reset_body("Alice", "https://example.com/reset?token=abc");
        assert!(body.starts_with("Hello Alice,"));
        assert!(body.contains("https://example.com/reset?token=abc"));
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let service = EmailService::new(EmailConfig::default());
        assert!(service.build_message("not an address", "s", "b").is_err());
        assert!(service.build_message("bob@example.com", "s", "b").is_ok());
    }

    #[tokio::test]
    async fn test_disabled_mailer_does_not_send() {
        let service = EmailService::new(EmailConfig::default());
        let result = service
            .send_password_reset("bob@example.com", "Bob", "http://localhost/reset?token=t")
            .await;
        tokio_test::assert_ok!(result);
    }
}
