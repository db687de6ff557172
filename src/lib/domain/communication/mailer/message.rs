//! Email message

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::domain::communication::{
    email_addresses::{Recipient, Sender},
    mailer::MailerError,
};

/// A file attached to an email
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// The file name shown to the recipient
    pub filename: String,

    /// The base64-encoded file content
    pub content: String,

    /// The MIME type of the file
    pub content_type: Option<String>,

    /// `attachment` or `inline`
    pub disposition: Option<String>,
}

impl Attachment {
    /// Creates an attachment. Line breaks and other whitespace in the base64
    /// `content` are dropped, so MIME-wrapped content is accepted.
    pub fn new(
        filename: impl Into<String>,
        content: &str,
        content_type: Option<String>,
        disposition: Option<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content: strip_whitespace(content),
            content_type,
            disposition,
        }
    }

    /// Decodes the base64 content into raw bytes
    pub fn decoded_content(&self) -> Result<Vec<u8>, MailerError> {
        STANDARD
            .decode(strip_whitespace(&self.content))
            .map_err(|e| MailerError::InvalidAttachment(format!("{}: {e}", self.filename)))
    }
}

fn strip_whitespace(content: &str) -> String {
    content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect()
}

/// A validated email, ready to be turned into a provider message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Email {
    /// The sender of the email
    pub from: Sender,

    /// The recipients of the email, in the order they were given
    pub recipients: Vec<Recipient>,

    /// The subject of the email
    pub subject: String,

    /// The HTML body of the email
    pub html: String,

    /// Files attached to the email
    pub attachments: Vec<Attachment>,
}
