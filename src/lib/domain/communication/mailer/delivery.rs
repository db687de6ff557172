//! Delivery reports

use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

/// The email-delivery providers the mail manager can talk to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// SendGrid v3 HTTP API
    #[default]
    Sendgrid,

    /// Any SMTP relay
    Smtp,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sendgrid => write!(f, "sendgrid"),
            Self::Smtp => write!(f, "smtp"),
        }
    }
}

/// What a provider answered when it was handed a message
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// The provider that handled the message
    pub provider: ProviderKind,

    /// HTTP status (SendGrid) or SMTP reply code
    pub status_code: Option<u16>,

    /// SendGrid's `X-Message-Id` header. For SMTP, the first line of the
    /// server's final reply text (e.g. `2.0.0 Ok: queued as ABC`), which
    /// usually carries the relay's queue id.
    pub message_id: Option<String>,

    /// When the provider answered
    pub sent_at: DateTime<Utc>,
}

impl DeliveryReport {
    /// Creates a report stamped with the current time
    pub fn new(provider: ProviderKind, status_code: Option<u16>, message_id: Option<String>) -> Self {
        Self {
            provider,
            status_code,
            message_id,
            sent_at: Utc::now(),
        }
    }

    /// Whether the provider accepted the message.
    ///
    /// Both HTTP and SMTP use 2xx codes for a positive completion.
    pub fn is_success(&self) -> bool {
        matches!(self.status_code, Some(code) if (200..=299).contains(&code))
    }
}

impl fmt::Display for DeliveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.provider)?;

        match self.status_code {
            Some(code) => write!(f, "{code}")?,
            None => write!(f, "-")?,
        }

        if let Some(id) = &self.message_id {
            write!(f, " {id}")?;
        }

        Ok(())
    }
}
