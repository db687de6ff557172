//! Mail provider module

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

mod delivery;
mod errors;
mod message;

pub use delivery::{DeliveryReport, ProviderKind};
pub use errors::MailerError;
pub use message::{Attachment, Email};

/// An email-delivery provider.
///
/// Sending happens in two steps so callers can build every message before
/// handing any of them over.
#[async_trait]
pub trait MailProvider: Clone + Send + Sync + 'static {
    /// The provider-specific message type
    type Message: Send + 'static;

    /// Which provider this is
    fn kind(&self) -> ProviderKind;

    /// Builds the provider message for a validated [`Email`].
    ///
    /// # Returns
    /// The provider message, or a [`MailerError`] when the email cannot be
    /// expressed for this provider (bad address, undecodable attachment).
    fn create_message(&self, email: &Email) -> Result<Self::Message, MailerError>;

    /// Hands a message to the provider.
    ///
    /// # Returns
    /// A [`DeliveryReport`] describing the provider's answer. A report is
    /// returned even when the provider refused the message; use
    /// [`MailProvider::is_successful_response`] to check it.
    async fn send_message(&self, message: Self::Message) -> Result<DeliveryReport, MailerError>;

    /// Whether a report means the message was accepted
    fn is_successful_response(&self, report: &DeliveryReport) -> bool {
        report.is_success()
    }
}

#[cfg(test)]
mock! {
    pub MailProvider {}

    impl Clone for MailProvider {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl MailProvider for MailProvider {
        type Message = Email;

        fn kind(&self) -> ProviderKind;
        fn create_message(&self, email: &Email) -> Result<Email, MailerError>;
        async fn send_message(&self, message: Email) -> Result<DeliveryReport, MailerError>;
    }
}
