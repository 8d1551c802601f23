//! SMTP notifier: one plain-text email per new notice.

use async_trait::async_trait;
use chrono::Local;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use noticewatch_core::{MailConfig, NoticeEmail, NoticeRecord, Notifier};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Sends notice emails through an authenticated STARTTLS relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    notice_page: String,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: config.username.parse()?,
            to: config.recipient.parse()?,
            notice_page: config.notice_page.clone(),
        })
    }

    /// Build the message for `record` without sending it.
    pub fn message(&self, record: &NoticeRecord) -> Result<Message, NotifyError> {
        let email = NoticeEmail::compose(record, &self.notice_page, Local::now());
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)?;
        Ok(message)
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    type Error = NotifyError;

    async fn notify(&self, record: &NoticeRecord) -> Result<(), NotifyError> {
        let message = self.message(record)?;
        self.transport.send(message).await?;
        info!(id = %record.id, to = %self.to, "notice email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailConfig {
        MailConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "bot@example.com".into(),
            password: "secret".into(),
            recipient: "placements@example.com".into(),
            notice_page: "https://erp.example/Notice.jsp".into(),
        }
    }

    #[tokio::test]
    async fn builds_addressed_plain_text_message() {
        let notifier = SmtpNotifier::new(&config()).unwrap();
        let record = NoticeRecord::new("88")
            .unwrap()
            .with_category("PPT")
            .with_company("Acme")
            .with_title("Talk");

        let message = notifier.message(&record).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("From: bot@example.com"));
        assert!(raw.contains("To: placements@example.com"));
        assert!(raw.contains("Subject: [ERP Notice] PPT - Acme"));
        assert!(raw.contains("Content-Type: text/plain"));
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected() {
        let mut config = config();
        config.recipient = "not an address".into();
        assert!(matches!(SmtpNotifier::new(&config), Err(NotifyError::Address(_))));
    }
}
