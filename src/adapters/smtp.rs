//! SMTP delivery via lettre with STARTTLS and a single file attachment.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailSender, OutgoingMail, SmtpCredentials};

/// Mail sender backed by an async lettre SMTP transport.
pub struct LettreMailer;

impl LettreMailer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LettreMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailSender for LettreMailer {
    async fn send(&self, credentials: &SmtpCredentials, mail: &OutgoingMail) -> Result<()> {
        let from: Mailbox = mail
            .from
            .parse()
            .with_context(|| format!("Invalid sender address: {}", mail.from))?;
        let to: Mailbox = mail
            .to
            .parse()
            .with_context(|| format!("Invalid recipient address: {}", mail.to))?;

        let filename = mail
            .attachment
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        let body = tokio::fs::read(&mail.attachment)
            .await
            .with_context(|| format!("Failed to read attachment: {}", mail.attachment.display()))?;

        let attachment = Attachment::new(filename).body(
            body,
            ContentType::parse("application/octet-stream").context("Invalid content type")?,
        );

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(&mail.subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(mail.body.clone()))
                    .singlepart(attachment),
            )
            .context("Failed to build message")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&credentials.host)
            .with_context(|| format!("Invalid SMTP host: {}", credentials.host))?
            .port(credentials.port)
            .credentials(Credentials::new(
                credentials.user.clone(),
                credentials.password.clone(),
            ))
            .build();

        transport
            .send(message)
            .await
            .with_context(|| format!("Failed to send mail via {}", credentials.host))?;

        Ok(())
    }
}
