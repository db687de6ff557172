//! Mail manager errors

use thiserror::Error;
use tracing::debug;

use crate::domain::communication::{envelope::EnvelopeError, mailer::MailerError};

/// Errors that can occur when sending emails through the mail manager
#[derive(Debug, Error)]
pub enum MailManagerError {
    /// The email attributes do not describe a sendable email
    #[error("{0}")]
    InvalidEmailTemplate(String),

    /// One or more emails were not accepted by the provider
    #[error("{failed} of {total} email(s) failed to be sent")]
    SendEmail {
        /// Number of emails the provider did not accept
        failed: usize,

        /// Number of emails handed to the provider
        total: usize,
    },

    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

impl MailManagerError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        MailManagerError::InvalidEmailTemplate(message.into())
    }
}

impl From<MailerError> for MailManagerError {
    fn from(err: MailerError) -> Self {
        debug!("MailerError -> MailManagerError");

        match err {
            MailerError::InvalidEmail => MailManagerError::invalid("Invalid email address"),
            MailerError::InvalidAttachment(msg) => {
                MailManagerError::invalid(format!("Invalid attachment: {msg}"))
            }
            MailerError::SendError => MailManagerError::SendEmail {
                failed: 1,
                total: 1,
            },
            MailerError::UnknownError(e) => MailManagerError::UnknownError(e),
        }
    }
}

impl From<EnvelopeError> for MailManagerError {
    fn from(err: EnvelopeError) -> Self {
        debug!("EnvelopeError -> MailManagerError");

        MailManagerError::invalid(err.to_string())
    }
}
