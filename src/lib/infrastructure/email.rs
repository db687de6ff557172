//! Email providers and their configuration

use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use clap::Parser;
use thiserror::Error;
use tracing::debug;

use crate::domain::communication::{
    mail_manager::{MailManager, SenderDefaults, DEFAULT_FROM_EMAIL, DEFAULT_FROM_NAME},
    mailer::{DeliveryReport, Email, MailProvider, MailerError, ProviderKind},
};

pub mod sendgrid;
pub mod smtp;

use sendgrid::{SendGridConfig, SendGridMessage, SendGridProvider};
use smtp::{SMTPConfig, SmtpProvider};

/// Errors that can occur while building a provider from configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting the selected provider needs was not given
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    /// The provider could not be built from the given settings
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

/// Mailer configuration, read from flags or the environment
#[derive(Clone, Debug, Parser)]
pub struct MailerConfig {
    /// The email-delivery provider to use
    #[clap(long, env = "MAIL_PROVIDER", value_enum, default_value_t = ProviderKind::Sendgrid)]
    pub provider: ProviderKind,

    /// Sender address used when an email does not name one
    #[clap(long, env = "MAIL_FROM_EMAIL", default_value = DEFAULT_FROM_EMAIL)]
    pub from_email: String,

    /// Sender name used when an email does not name one
    #[clap(long, env = "MAIL_FROM_NAME", default_value = DEFAULT_FROM_NAME)]
    pub from_name: String,

    /// SendGrid settings
    #[clap(flatten)]
    pub sendgrid: SendGridConfig,

    /// SMTP settings
    #[clap(flatten)]
    pub smtp: SMTPConfig,
}

impl MailerConfig {
    /// The sender defaults applied during email setup
    pub fn sender_defaults(&self) -> SenderDefaults {
        SenderDefaults {
            from_email: self.from_email.clone(),
            from_name: self.from_name.clone(),
        }
    }

    /// Builds the selected provider
    ///
    /// # Panics
    ///
    /// The SMTP provider must be built from within a Tokio runtime; see
    /// [`SmtpProvider::new`].
    pub fn build_provider(&self) -> Result<Provider, ConfigError> {
        debug!(provider = %self.provider, "building mail provider");

        match self.provider {
            ProviderKind::Sendgrid => {
                let api_key = self
                    .sendgrid
                    .api_key
                    .as_deref()
                    .filter(|key| !key.is_empty())
                    .ok_or(ConfigError::Missing("SENDGRID_API_KEY"))?;

                Ok(Provider::Sendgrid(SendGridProvider::new(
                    api_key,
                    &self.sendgrid.api_url,
                    Duration::from_secs(self.sendgrid.timeout_secs),
                )?))
            }
            ProviderKind::Smtp => {
                let host = self
                    .smtp
                    .host
                    .as_deref()
                    .filter(|host| !host.is_empty())
                    .ok_or(ConfigError::Missing("SMTP_HOST"))?;

                Ok(Provider::Smtp(SmtpProvider::new(host, &self.smtp)?))
            }
        }
    }

    /// Builds a mail manager for the selected provider
    ///
    /// # Panics
    ///
    /// Same as [`MailerConfig::build_provider`].
    pub fn mail_manager(&self) -> Result<MailManager<Provider>, ConfigError> {
        Ok(MailManager::new(
            self.build_provider()?,
            self.sender_defaults(),
        ))
    }
}

/// A provider chosen at runtime
#[derive(Clone, Debug)]
pub enum Provider {
    /// SendGrid v3 HTTP API
    Sendgrid(SendGridProvider),

    /// SMTP relay
    Smtp(SmtpProvider),
}

/// A message built by a [`Provider`]
#[derive(Debug)]
pub enum ProviderMessage {
    /// A SendGrid request body
    Sendgrid(SendGridMessage),

    /// A MIME message
    Smtp(Box<lettre::Message>),
}

#[async_trait]
impl MailProvider for Provider {
    type Message = ProviderMessage;

    fn kind(&self) -> ProviderKind {
        match self {
            Provider::Sendgrid(provider) => provider.kind(),
            Provider::Smtp(provider) => provider.kind(),
        }
    }

    fn create_message(&self, email: &Email) -> Result<ProviderMessage, MailerError> {
        match self {
            Provider::Sendgrid(provider) => {
                Ok(ProviderMessage::Sendgrid(provider.create_message(email)?))
            }
            Provider::Smtp(provider) => Ok(ProviderMessage::Smtp(Box::new(
                provider.create_message(email)?,
            ))),
        }
    }

    async fn send_message(&self, message: ProviderMessage) -> Result<DeliveryReport, MailerError> {
        match (self, message) {
            (Provider::Sendgrid(provider), ProviderMessage::Sendgrid(message)) => {
                provider.send_message(message).await
            }
            (Provider::Smtp(provider), ProviderMessage::Smtp(message)) => {
                provider.send_message(*message).await
            }
            _ => Err(MailerError::UnknownError(anyhow!(
                "message was built for another provider than {}",
                self.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::communication::email_addresses::{EmailAddress, Recipient, Sender};

    use super::*;

    fn parse(args: &[&str]) -> Result<MailerConfig, clap::Error> {
        MailerConfig::try_parse_from(std::iter::once("mailmanager").chain(args.iter().copied()))
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(parse(&["--provider", "mailjet"]).is_err());
    }

    #[test]
    fn test_sender_defaults_from_flags() -> TestResult {
        let config = parse(&[
            "--from-email",
            "noreply@example.com",
            "--from-name",
            "Example",
        ])?;

        assert_eq!(
            config.sender_defaults(),
            SenderDefaults {
                from_email: "noreply@example.com".to_string(),
                from_name: "Example".to_string(),
            }
        );

        Ok(())
    }

    #[test]
    fn test_sendgrid_requires_api_key() -> TestResult {
        let mut config = parse(&["--provider", "sendgrid"])?;
        config.sendgrid.api_key = None;

        let result = config.build_provider();

        assert!(matches!(
            result,
            Err(ConfigError::Missing("SENDGRID_API_KEY"))
        ));

        Ok(())
    }

    #[test]
    fn test_build_sendgrid_provider() -> TestResult {
        let config = parse(&[
            "--provider",
            "sendgrid",
            "--sendgrid-api-key",
            "foo",
            "--sendgrid-api-url",
            "http://localhost:8080",
        ])?;

        match config.build_provider()? {
            Provider::Sendgrid(provider) => {
                assert_eq!(provider.endpoint(), "http://localhost:8080/v3/mail/send")
            }
            other => panic!("expected SendGrid provider, got {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn test_smtp_requires_host() -> TestResult {
        let mut config = parse(&["--provider", "smtp"])?;
        config.smtp.host = None;

        let result = config.build_provider();

        assert!(matches!(result, Err(ConfigError::Missing("SMTP_HOST"))));

        Ok(())
    }

    #[tokio::test]
    async fn test_build_smtp_manager() -> TestResult {
        let config = parse(&[
            "--provider",
            "smtp",
            "--smtp-host",
            "localhost",
            "--smtp-port",
            "1025",
        ])?;

        let manager = config.mail_manager()?;

        assert_eq!(manager.provider().kind(), ProviderKind::Smtp);

        Ok(())
    }

    #[tokio::test]
    async fn test_mismatched_message_is_refused() -> TestResult {
        let sendgrid = parse(&["--sendgrid-api-key", "foo"])?.build_provider()?;
        let smtp = parse(&["--provider", "smtp", "--smtp-host", "localhost"])?.build_provider()?;

        let email = Email {
            from: Sender::new(EmailAddress::new("a@example.com")?, "A"),
            recipients: vec![Recipient::new(EmailAddress::new("b@example.com")?, None)],
            subject: "s".to_string(),
            html: "<p>h</p>".to_string(),
            attachments: Vec::new(),
        };

        let message = smtp.create_message(&email)?;
        let result = sendgrid.send_message(message).await;

        assert!(matches!(result, Err(MailerError::UnknownError(_))));

        Ok(())
    }
}
