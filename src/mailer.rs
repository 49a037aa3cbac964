use std::env;

use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("Invalid attachment content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("Delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Outbound SMTP delivery for receipt PDFs.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Builds a mailer from `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`,
    /// `SMTP_PORT` (default 587) and `MAIL_FROM` (default `SMTP_USERNAME`).
    /// Returns `None` when SMTP is not configured, which disables the email
    /// feature instead of failing startup.
    pub fn from_env() -> Option<Self> {
        let host = env::var("SMTP_HOST").ok()?;
        let username = env::var("SMTP_USERNAME").unwrap_or_default();
        let password = env::var("SMTP_PASSWORD").unwrap_or_default();
        let port = env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(587);
        let from_raw = env::var("MAIL_FROM").unwrap_or_else(|_| username.clone());

        let from: Mailbox = match from_raw.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                log::error!("Invalid MAIL_FROM address {:?}: {}", from_raw, e);
                return None;
            }
        };

        let transport = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host) {
            Ok(builder) => builder
                .port(port)
                .credentials(Credentials::new(username, password))
                .build(),
            Err(e) => {
                log::error!("Invalid SMTP configuration for {:?}: {}", host, e);
                return None;
            }
        };

        Some(Self { transport, from })
    }

    /// Sends a receipt PDF to the client. The caller catches failures and
    /// surfaces them as a flash message; they never fail the request.
    pub async fn send_receipt(
        &self,
        to: &str,
        client_name: &str,
        business_name: &str,
        receipt_id: i64,
        pdf: Vec<u8>,
    ) -> Result<(), MailError> {
        let message = build_message(
            &self.from,
            to,
            client_name,
            business_name,
            receipt_id,
            pdf,
        )?;
        self.transport.send(message).await?;
        log::info!("Receipt {} emailed to {}", receipt_id, to);
        Ok(())
    }
}

fn build_message(
    from: &Mailbox,
    to: &str,
    client_name: &str,
    business_name: &str,
    receipt_id: i64,
    pdf: Vec<u8>,
) -> Result<Message, MailError> {
    let recipient: Mailbox = to.parse()?;
    let body = format!(
        "Hello {},\n\nPlease find your receipt attached.\n\nThank you,\n{}",
        client_name, business_name
    );
    let attachment = Attachment::new(format!("receipt_{}.pdf", receipt_id))
        .body(pdf, ContentType::parse("application/pdf")?);

    let message = Message::builder()
        .from(from.clone())
        .to(recipient)
        .subject(format!("Receipt from {}", business_name))
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(body))
                .singlepart(attachment),
        )?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_message_with_pdf_attachment() {
        let from: Mailbox = "Billing <billing@example.com>".parse().unwrap();
        let message = build_message(
            &from,
            "bob@example.com",
            "Bob",
            "ACME",
            7,
            b"%PDF-1.4".to_vec(),
        )
        .unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(raw.contains("Receipt from ACME"));
        assert!(raw.contains("receipt_7.pdf"));
    }

    #[test]
    fn rejects_malformed_recipient() {
        let from: Mailbox = "billing@example.com".parse().unwrap();
        let result = build_message(&from, "not-an-address", "Bob", "ACME", 7, Vec::new());
        assert!(matches!(result, Err(MailError::Address(_))));
    }
}
