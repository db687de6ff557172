//! SendGrid v3 provider

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use serde::Serialize;
use tracing::{debug, error};

use crate::domain::communication::{
    email_addresses::Recipient,
    mailer::{DeliveryReport, Email, MailProvider, MailerError, ProviderKind},
};

/// Public SendGrid API root
pub const DEFAULT_API_URL: &str = "https://api.sendgrid.com";

/// SendGrid configuration
#[derive(Clone, Debug, Parser)]
pub struct SendGridConfig {
    /// The SendGrid API key
    #[clap(long = "sendgrid-api-key", env = "SENDGRID_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// The SendGrid API root URL
    #[clap(long = "sendgrid-api-url", env = "SENDGRID_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Request timeout, in seconds
    #[clap(long = "sendgrid-timeout", env = "SENDGRID_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
}

/// A `mail/send` request body
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendGridMessage {
    /// Recipient groups; all recipients share a single group
    pub personalizations: Vec<Personalization>,

    /// The sender
    pub from: SendGridAddress,

    /// The subject line
    pub subject: String,

    /// Body parts
    pub content: Vec<Content>,

    /// Attached files
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<SendGridAttachment>,
}

/// A recipient group
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Personalization {
    /// The `To` recipients
    pub to: Vec<SendGridAddress>,
}

/// An address with an optional display name
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendGridAddress {
    /// The address
    pub email: String,

    /// The display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Recipient> for SendGridAddress {
    fn from(recipient: &Recipient) -> Self {
        Self {
            email: recipient.email.to_string(),
            name: recipient.name.clone(),
        }
    }
}

/// A body part
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Content {
    /// MIME type of the part
    #[serde(rename = "type")]
    pub content_type: String,

    /// The part itself
    pub value: String,
}

/// An attached file; content stays base64-encoded
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendGridAttachment {
    /// Base64 file content
    pub content: String,

    /// File name
    pub filename: String,

    /// MIME type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// `attachment` or `inline`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
}

/// SendGrid provider
#[derive(Clone)]
pub struct SendGridProvider {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl SendGridProvider {
    /// Creates a new SendGrid provider
    pub fn new(api_key: &str, api_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build SendGrid HTTP client")?;

        Ok(Self {
            api_key: api_key.to_string(),
            endpoint: format!("{}/v3/mail/send", api_url.trim_end_matches('/')),
            client,
        })
    }

    /// The URL messages are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for SendGridProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendGridProvider")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MailProvider for SendGridProvider {
    type Message = SendGridMessage;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Sendgrid
    }

    fn create_message(&self, email: &Email) -> Result<SendGridMessage, MailerError> {
        Ok(SendGridMessage {
            personalizations: vec![Personalization {
                to: email.recipients.iter().map(SendGridAddress::from).collect(),
            }],
            from: SendGridAddress {
                email: email.from.email.to_string(),
                name: Some(email.from.name.clone()),
            },
            subject: email.subject.clone(),
            content: vec![Content {
                content_type: "text/html".to_string(),
                value: email.html.clone(),
            }],
            attachments: email
                .attachments
                .iter()
                .map(|a| SendGridAttachment {
                    content: a.content.clone(),
                    filename: a.filename.clone(),
                    content_type: a.content_type.clone(),
                    disposition: a.disposition.clone(),
                })
                .collect(),
        })
    }

    async fn send_message(&self, message: SendGridMessage) -> Result<DeliveryReport, MailerError> {
        debug!(endpoint = %self.endpoint, "posting message to SendGrid");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        let message_id = response
            .headers()
            .get("X-Message-Id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            error!(status = status.as_u16(), %body, "SendGrid refused the message");
        }

        Ok(DeliveryReport::new(
            ProviderKind::Sendgrid,
            Some(status.as_u16()),
            message_id,
        ))
    }
}
