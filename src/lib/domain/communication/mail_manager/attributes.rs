//! Caller-facing email attributes

use serde::{Deserialize, Deserializer, Serialize};

/// Sender address used when the caller does not give one
pub const DEFAULT_FROM_EMAIL: &str = "noreply@mail.toucantoco.com";

/// Sender name used when the caller does not give one
pub const DEFAULT_FROM_NAME: &str = "Toucan Toco";

/// A recipient as described by the caller
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecipientAttributes {
    /// The recipient's address
    #[serde(rename = "Email", alias = "email")]
    pub email: String,

    /// The recipient's display name
    #[serde(
        rename = "Name",
        alias = "name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
}

impl RecipientAttributes {
    /// Creates a recipient without a display name
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Creates a recipient with a display name
    pub fn named(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }
}

/// An attachment as described by the caller
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttachmentAttributes {
    /// The file name shown to the recipient
    pub filename: String,

    /// The base64-encoded file content
    pub content: String,

    /// The MIME type of the file
    #[serde(
        rename = "type",
        alias = "content_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<String>,

    /// `attachment` or `inline`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
}

/// Everything a caller may say about an email. Unset fields are filled from
/// [`SenderDefaults`] before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EmailAttributes {
    /// The sender's address
    #[serde(
        rename = "FromEmail",
        alias = "from_email",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub from_email: Option<String>,

    /// The sender's display name
    #[serde(
        rename = "FromName",
        alias = "from_name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub from_name: Option<String>,

    /// The subject line
    #[serde(
        rename = "Subject",
        alias = "subject",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subject: Option<String>,

    /// The HTML body
    #[serde(
        rename = "Html-part",
        alias = "html_part",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub html_part: Option<String>,

    /// Files attached to the email; a single object is accepted too
    #[serde(
        rename = "Attachments",
        alias = "attachments",
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub attachments: Option<Vec<AttachmentAttributes>>,

    /// The recipients
    #[serde(
        rename = "Recipients",
        alias = "recipients",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub recipients: Option<Vec<RecipientAttributes>>,
}

impl EmailAttributes {
    /// Creates an empty set of attributes
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no attribute at all has been set
    pub fn is_empty(&self) -> bool {
        self.from_email.is_none()
            && self.from_name.is_none()
            && self.subject.is_none()
            && self.html_part.is_none()
            && self.attachments.is_none()
            && self.recipients.is_none()
    }

    /// Sets the sender address and name
    pub fn sender(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.from_email = Some(email.into());
        self.from_name = Some(name.into());
        self
    }

    /// Sets the subject
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the HTML body
    pub fn html_part(mut self, html: impl Into<String>) -> Self {
        self.html_part = Some(html.into());
        self
    }

    /// Appends a recipient
    pub fn recipient(mut self, recipient: RecipientAttributes) -> Self {
        self.recipients.get_or_insert_with(Vec::new).push(recipient);
        self
    }

    /// Appends an attachment
    pub fn attachment(mut self, attachment: AttachmentAttributes) -> Self {
        self.attachments
            .get_or_insert_with(Vec::new)
            .push(attachment);
        self
    }
}

/// Values applied to every unset attribute during setup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderDefaults {
    /// Default sender address
    pub from_email: String,

    /// Default sender display name
    pub from_name: String,
}

impl Default for SenderDefaults {
    fn default() -> Self {
        Self {
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            from_name: DEFAULT_FROM_NAME.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoAttachment {}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<AttachmentAttributes>),
    One(AttachmentAttributes),
    Empty(NoAttachment),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<AttachmentAttributes>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<OneOrMany>::deserialize(deserializer)?.map(|value| match value {
            OneOrMany::Many(all) => all,
            OneOrMany::One(one) => vec![one],
            OneOrMany::Empty(_) => Vec::new(),
        }),
    )
}
