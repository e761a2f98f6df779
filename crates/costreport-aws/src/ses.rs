//! SES v2 mail delivery
//!
//! The message is assembled as raw MIME (plain-text body plus one attachment
//! per exported file) and handed to SES unchanged.

use crate::error::AwsAdapterError;
use async_trait::async_trait;
use aws_sdk_sesv2::Client;
use aws_sdk_sesv2::primitives::Blob;
use aws_sdk_sesv2::types::{Destination, EmailContent, RawMessage};
use costreport_core::delivery::{Mailer, OutgoingMail};
use costreport_core::error::{CostReportError, Result};
use lettre::Message;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use std::path::Path;
use tracing::info;

/// [`Mailer`] sending raw messages through SES
pub struct SesMailer {
    client: Client,
}

impl SesMailer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client using the default credential chain in `region`
    pub async fn from_env(region: &str) -> Self {
        let config = crate::load_config(region).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let mut files = Vec::with_capacity(mail.attachments.len());
        for path in &mail.attachments {
            files.push((attachment_name(path), tokio::fs::read(path).await?));
        }
        let raw = build_raw_message(mail, files).map_err(delivery)?;

        let raw_message = RawMessage::builder()
            .data(Blob::new(raw))
            .build()
            .map_err(|e| delivery(AwsAdapterError::malformed("SendEmail", e)))?;

        let response = self
            .client
            .send_email()
            .from_email_address(&mail.from)
            .destination(
                Destination::builder()
                    .set_to_addresses(Some(mail.to.clone()))
                    .build(),
            )
            .content(EmailContent::builder().raw(raw_message).build())
            .send()
            .await
            .map_err(|e| delivery(AwsAdapterError::from_sdk("SendEmail", e)))?;

        info!(
            message_id = response.message_id().unwrap_or_default(),
            recipients = mail.to.len(),
            "Report mail sent"
        );
        Ok(())
    }
}

fn delivery(err: AwsAdapterError) -> CostReportError {
    CostReportError::Delivery(err.to_string())
}

fn attachment_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string())
}

fn content_type_for(name: &str) -> &'static str {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// Assemble the MIME message for `mail` with the given attachment contents
pub fn build_raw_message(
    mail: &OutgoingMail,
    attachments: Vec<(String, Vec<u8>)>,
) -> std::result::Result<Vec<u8>, AwsAdapterError> {
    let from: Mailbox = mail
        .from
        .parse()
        .map_err(|e| AwsAdapterError::Mail(format!("invalid sender {}: {e}", mail.from)))?;
    if mail.to.is_empty() {
        return Err(AwsAdapterError::Mail("no recipients".to_string()));
    }

    let mut builder = Message::builder().from(from).subject(&mail.subject).date_now();
    for recipient in &mail.to {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| AwsAdapterError::Mail(format!("invalid recipient {recipient}: {e}")))?;
        builder = builder.to(to);
    }

    let mut body = MultiPart::mixed().singlepart(SinglePart::plain(mail.body.clone()));
    for (name, content) in attachments {
        let content_type = ContentType::parse(content_type_for(&name))
            .map_err(|e| AwsAdapterError::Mail(e.to_string()))?;
        body = body.singlepart(Attachment::new(name).body(content, content_type));
    }

    let message = builder
        .multipart(body)
        .map_err(|e| AwsAdapterError::Mail(e.to_string()))?;
    Ok(message.formatted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail::report("costs@example.com", to, vec![PathBuf::from("/tmp/Usage.csv")])
    }

    #[test]
    fn test_raw_message_has_body_and_attachment() {
        let raw = build_raw_message(
            &mail("a@example.com,b@example.com"),
            vec![("Usage.csv".to_string(), b"Key,2024-01-01\nEC2,1\n".to_vec())],
        )
        .unwrap();
        let text = String::from_utf8(raw).unwrap();

        assert!(text.contains("Subject: Cost Explorer Report"));
        assert!(text.contains("From: costs@example.com"));
        assert!(text.contains("a@example.com"));
        assert!(text.contains("b@example.com"));
        assert!(text.contains("multipart/mixed"));
        assert!(text.contains("filename=\"Usage.csv\""));
        assert!(text.contains("Find your Cost Explorer report attached"));
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let mut mail = mail("a@example.com");
        mail.from = "not an address".to_string();
        assert!(matches!(
            build_raw_message(&mail, vec![]),
            Err(AwsAdapterError::Mail(_))
        ));
    }

    #[test]
    fn test_no_recipients_rejected() {
        assert!(build_raw_message(&mail(""), vec![]).is_err());
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type_for("Usage.csv"), "text/csv");
        assert_eq!(content_type_for("report.json"), "application/json");
        assert_eq!(content_type_for("report"), "application/octet-stream");
    }

    #[test]
    fn test_attachment_name_from_path() {
        assert_eq!(attachment_name(Path::new("/tmp/out/Services.csv")), "Services.csv");
    }
}
