//! Mail manager service

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument};

#[cfg(test)]
use mockall::mock;

use crate::domain::communication::{
    email_addresses::{EmailAddress, Recipient, Sender},
    envelope::Envelope,
    mail_manager::{EmailAttributes, MailManagerError, RecipientAttributes, SenderDefaults},
    mailer::{Attachment, DeliveryReport, Email, MailProvider},
};

/// Provider-agnostic email sending
#[async_trait]
pub trait MailService: Clone + Send + Sync + 'static {
    /// Sends a single email.
    ///
    /// # Arguments
    /// * `attributes` - What the caller knows about the email. Unset fields
    ///   are filled from the sender defaults.
    ///
    /// # Returns
    /// - [`Ok`] with the provider's [`DeliveryReport`] when the email was accepted.
    /// - [`Err`] with [`MailManagerError::InvalidEmailTemplate`] when the
    ///   attributes do not describe a sendable email, or
    ///   [`MailManagerError::SendEmail`] when the provider did not accept it.
    async fn send_email(
        &self,
        attributes: EmailAttributes,
    ) -> Result<DeliveryReport, MailManagerError>;

    /// Sends several emails.
    ///
    /// Every email is validated before any is sent. Once sending starts, a
    /// failure does not stop the remaining emails from being sent.
    ///
    /// # Returns
    /// - [`Ok`] with one [`DeliveryReport`] per email, in order, when all were accepted.
    /// - [`Err`] with [`MailManagerError::SendEmail`] counting the failures otherwise.
    async fn send_emails(
        &self,
        attributes: Vec<EmailAttributes>,
    ) -> Result<Vec<DeliveryReport>, MailManagerError>;
}

#[cfg(test)]
mock! {
    pub MailService {}

    impl Clone for MailService {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl MailService for MailService {
        async fn send_email(&self, attributes: EmailAttributes) -> Result<DeliveryReport, MailManagerError>;
        async fn send_emails(&self, attributes: Vec<EmailAttributes>) -> Result<Vec<DeliveryReport>, MailManagerError>;
    }
}

/// Mail manager: fills defaults, validates, and hands emails to a [`MailProvider`]
#[derive(Debug, Clone)]
pub struct MailManager<P>
where
    P: MailProvider,
{
    provider: Arc<P>,
    defaults: SenderDefaults,
}

impl<P> MailManager<P>
where
    P: MailProvider,
{
    /// Creates a new mail manager.
    pub fn new(provider: P, defaults: SenderDefaults) -> Self {
        Self {
            provider: Arc::new(provider),
            defaults,
        }
    }

    /// The provider emails are handed to
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fills every unset attribute with its default value.
    pub fn setup_email_template(
        &self,
        attributes: EmailAttributes,
    ) -> Result<EmailAttributes, MailManagerError> {
        if attributes.is_empty() {
            return Err(MailManagerError::invalid(
                "Missing values to setup email template",
            ));
        }

        Ok(EmailAttributes {
            from_email: attributes
                .from_email
                .or_else(|| Some(self.defaults.from_email.clone())),
            from_name: attributes
                .from_name
                .or_else(|| Some(self.defaults.from_name.clone())),
            subject: attributes.subject.or_else(|| Some(String::new())),
            html_part: attributes.html_part.or_else(|| Some(String::new())),
            attachments: attributes.attachments.or_else(|| Some(Vec::new())),
            recipients: attributes.recipients.or_else(|| Some(Vec::new())),
        })
    }

    /// Checks that set-up attributes describe a sendable email and turns them
    /// into an [`Email`].
    pub fn validate_email_template(
        &self,
        template: &EmailAttributes,
    ) -> Result<Email, MailManagerError> {
        let subject = template.subject.as_deref().unwrap_or_default();
        let html = template.html_part.as_deref().unwrap_or_default();
        let recipients = template.recipients.as_deref().unwrap_or_default();

        validate_not_blank("Subject", subject)?;
        validate_not_blank("Html-part", html)?;

        if recipients.is_empty() {
            return Err(MailManagerError::invalid(
                "The email template should have at least one recipient",
            ));
        }

        let from_email = template
            .from_email
            .as_deref()
            .unwrap_or(&self.defaults.from_email);
        let from_name = template
            .from_name
            .as_deref()
            .unwrap_or(&self.defaults.from_name);

        let recipients = recipients
            .iter()
            .map(|r| Ok(Recipient::new(parse_address(&r.email)?, r.name.clone())))
            .collect::<Result<Vec<_>, MailManagerError>>()?;

        let attachments = template
            .attachments
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|a| {
                let attachment = Attachment::new(
                    a.filename.clone(),
                    &a.content,
                    a.content_type.clone(),
                    a.disposition.clone(),
                );

                if attachment.filename.trim().is_empty() {
                    return Err(MailManagerError::invalid(
                        "An attachment of the email template has no filename",
                    ));
                }

                attachment.decoded_content()?;

                Ok(attachment)
            })
            .collect::<Result<Vec<_>, MailManagerError>>()?;

        Ok(Email {
            from: Sender::new(parse_address(from_email)?, from_name),
            recipients,
            subject: subject.to_string(),
            html: html.to_string(),
            attachments,
        })
    }

    /// Renders an [`Envelope`] and sends it to `recipients`.
    pub async fn send_envelope<E>(
        &self,
        envelope: &E,
        recipients: Vec<RecipientAttributes>,
    ) -> Result<DeliveryReport, MailManagerError>
    where
        E: Envelope + ?Sized,
    {
        let attributes = envelope.to_attributes(recipients)?;

        self.send_email(attributes).await
    }

    fn prepare(&self, attributes: EmailAttributes) -> Result<Email, MailManagerError> {
        let template = self.setup_email_template(attributes)?;

        self.validate_email_template(&template)
    }

    /// Sends one provider message and reports whether the provider accepted it
    async fn deliver(&self, message: P::Message) -> Option<DeliveryReport> {
        let kind = self.provider.kind();

        match self.provider.send_message(message).await {
            Ok(report) if self.provider.is_successful_response(&report) => {
                info!(provider = %kind, status = ?report.status_code, "email sent");
                Some(report)
            }
            Ok(report) => {
                error!(provider = %kind, status = ?report.status_code, "email rejected by provider");
                None
            }
            Err(e) => {
                error!(provider = %kind, error = %e, "send_message failed");
                None
            }
        }
    }
}

#[async_trait]
impl<P> MailService for MailManager<P>
where
    P: MailProvider,
{
    #[instrument(skip_all)]
    async fn send_email(
        &self,
        attributes: EmailAttributes,
    ) -> Result<DeliveryReport, MailManagerError> {
        let email = self.prepare(attributes)?;
        let message = self.provider.create_message(&email)?;

        self.deliver(message)
            .await
            .ok_or(MailManagerError::SendEmail {
                failed: 1,
                total: 1,
            })
    }

    #[instrument(skip_all, fields(count = attributes.len()))]
    async fn send_emails(
        &self,
        attributes: Vec<EmailAttributes>,
    ) -> Result<Vec<DeliveryReport>, MailManagerError> {
        let emails = attributes
            .into_iter()
            .map(|a| self.prepare(a))
            .collect::<Result<Vec<_>, _>>()?;

        let messages = emails
            .iter()
            .map(|email| self.provider.create_message(email))
            .collect::<Result<Vec<_>, _>>()?;

        let total = messages.len();
        let mut reports = Vec::with_capacity(total);

        for message in messages {
            if let Some(report) = self.deliver(message).await {
                reports.push(report);
            }
        }

        let failed = total - reports.len();

        if failed > 0 {
            return Err(MailManagerError::SendEmail { failed, total });
        }

        Ok(reports)
    }
}

fn validate_not_blank(field_name: &str, content: &str) -> Result<(), MailManagerError> {
    if content.trim().is_empty() {
        return Err(MailManagerError::invalid(format!(
            "The \"{field_name}\" of email template is empty"
        )));
    }

    Ok(())
}

fn parse_address(raw: &str) -> Result<EmailAddress, MailManagerError> {
    EmailAddress::new(raw)
        .map_err(|_| MailManagerError::invalid(format!("Invalid email address: {raw}")))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use testresult::TestResult;

    use crate::domain::communication::{
        envelope::{tests::GreetingTemplate, TemplateEnvelope},
        mail_manager::AttachmentAttributes,
        mailer::{tests::MockMailProvider, MailerError, ProviderKind},
    };

    use super::*;

    fn accepted() -> DeliveryReport {
        DeliveryReport::new(ProviderKind::Sendgrid, Some(202), None)
    }

    fn rejected() -> DeliveryReport {
        DeliveryReport::new(ProviderKind::Sendgrid, Some(400), None)
    }

    fn passthrough_provider() -> MockMailProvider {
        let mut provider = MockMailProvider::new();

        provider.expect_kind().return_const(ProviderKind::Sendgrid);
        provider
            .expect_create_message()
            .returning(|email| Ok(email.clone()));

        provider
    }

    fn manager(provider: MockMailProvider) -> MailManager<MockMailProvider> {
        MailManager::new(provider, SenderDefaults::default())
    }

    fn minimal_attributes() -> EmailAttributes {
        EmailAttributes::new()
            .subject("Test email")
            .html_part("Test content")
            .recipient(RecipientAttributes::new("test@example.com"))
    }

    #[test]
    fn test_setup_email_template_rejects_empty_attributes() {
        let result = manager(MockMailProvider::new()).setup_email_template(EmailAttributes::new());

        assert!(
            matches!(result, Err(MailManagerError::InvalidEmailTemplate(msg)) if msg == "Missing values to setup email template")
        );
    }

    #[test]
    fn test_setup_email_template_fills_defaults() -> TestResult {
        let template = manager(MockMailProvider::new())
            .setup_email_template(EmailAttributes::new().subject("Hello"))?;

        assert_eq!(
            template.from_email.as_deref(),
            Some("noreply@mail.toucantoco.com")
        );
        assert_eq!(template.from_name.as_deref(), Some("Toucan Toco"));
        assert_eq!(template.subject.as_deref(), Some("Hello"));
        assert_eq!(template.html_part.as_deref(), Some(""));
        assert_eq!(template.attachments, Some(Vec::new()));
        assert_eq!(template.recipients, Some(Vec::new()));

        Ok(())
    }

    #[test]
    fn test_setup_email_template_keeps_caller_sender() -> TestResult {
        let template = manager(MockMailProvider::new()).setup_email_template(
            EmailAttributes::new().sender("noreply@example.com", "Example"),
        )?;

        assert_eq!(template.from_email.as_deref(), Some("noreply@example.com"));
        assert_eq!(template.from_name.as_deref(), Some("Example"));

        Ok(())
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Subject", "Want some news ?").is_ok());

        let empty = validate_not_blank("Subject", "");
        assert!(
            matches!(empty, Err(MailManagerError::InvalidEmailTemplate(msg)) if msg == "The \"Subject\" of email template is empty")
        );

        assert!(validate_not_blank("Subject", " \n  ").is_err());
    }

    #[test]
    fn test_validate_email_template_blank_html() -> TestResult {
        let manager = manager(MockMailProvider::new());
        let template =
            manager.setup_email_template(minimal_attributes().html_part("   "))?;

        let result = manager.validate_email_template(&template);

        assert!(
            matches!(result, Err(MailManagerError::InvalidEmailTemplate(msg)) if msg.contains("Html-part"))
        );

        Ok(())
    }

    #[test]
    fn test_validate_email_template_requires_recipient() -> TestResult {
        let manager = manager(MockMailProvider::new());
        let template = manager.setup_email_template(
            EmailAttributes::new()
                .subject("Test email")
                .html_part("Test content"),
        )?;

        let result = manager.validate_email_template(&template);

        assert!(
            matches!(result, Err(MailManagerError::InvalidEmailTemplate(msg)) if msg == "The email template should have at least one recipient")
        );

        Ok(())
    }

    #[test]
    fn test_validate_email_template_rejects_bad_address() -> TestResult {
        let manager = manager(MockMailProvider::new());
        let template = manager.setup_email_template(
            minimal_attributes().recipient(RecipientAttributes::new("not-an-address")),
        )?;

        let result = manager.validate_email_template(&template);

        assert!(
            matches!(result, Err(MailManagerError::InvalidEmailTemplate(msg)) if msg == "Invalid email address: not-an-address")
        );

        Ok(())
    }

    #[test]
    fn test_validate_email_template_rejects_undecodable_attachment() -> TestResult {
        let manager = manager(MockMailProvider::new());
        let template = manager.setup_email_template(minimal_attributes().attachment(
            AttachmentAttributes {
                filename: "screenshot.png".to_string(),
                content: "%%%".to_string(),
                ..Default::default()
            },
        ))?;

        let result = manager.validate_email_template(&template);

        assert!(matches!(
            result,
            Err(MailManagerError::InvalidEmailTemplate(_))
        ));

        Ok(())
    }

    #[test]
    fn test_validate_email_template_accepts_wrapped_attachment() -> TestResult {
        let manager = manager(MockMailProvider::new());
        let template = manager.setup_email_template(minimal_attributes().attachment(
            AttachmentAttributes {
                filename: "f".to_string(),
                content: "QUFB\nQUFB".to_string(),
                ..Default::default()
            },
        ))?;

        let email = manager.validate_email_template(&template)?;

        assert_eq!(email.attachments[0].content, "QUFBQUFB");
        assert_eq!(email.attachments[0].decoded_content()?, b"AAAAAA".to_vec());

        Ok(())
    }

    #[test]
    fn test_validate_email_template_builds_email() -> TestResult {
        let manager = manager(MockMailProvider::new());
        let template = manager.setup_email_template(
            minimal_attributes()
                .recipient(RecipientAttributes::named("test2@example.com", "Test"))
                .attachment(AttachmentAttributes {
                    filename: "screenshot.png".to_string(),
                    content: "QA==".to_string(),
                    content_type: Some("image/png".to_string()),
                    disposition: Some("attachment".to_string()),
                }),
        )?;

        let email = manager.validate_email_template(&template)?;

        assert_eq!(email.from.email.as_str(), "noreply@mail.toucantoco.com");
        assert_eq!(email.from.name, "Toucan Toco");
        assert_eq!(
            email
                .recipients
                .iter()
                .map(|r| r.email.as_str())
                .collect::<Vec<_>>(),
            vec!["test@example.com", "test2@example.com"]
        );
        assert_eq!(email.recipients[1].name.as_deref(), Some("Test"));
        assert_eq!(email.attachments.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_send_email_success() -> TestResult {
        let mut provider = passthrough_provider();

        provider
            .expect_send_message()
            .times(1)
            .returning(|_| Ok(accepted()));

        let report = manager(provider).send_email(minimal_attributes()).await?;

        assert_eq!(report.status_code, Some(202));

        Ok(())
    }

    #[tokio::test]
    async fn test_send_email_rejected_by_provider() {
        let mut provider = passthrough_provider();

        provider
            .expect_send_message()
            .times(1)
            .returning(|_| Ok(rejected()));

        let result = manager(provider).send_email(minimal_attributes()).await;

        assert!(matches!(
            result,
            Err(MailManagerError::SendEmail {
                failed: 1,
                total: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_send_email_provider_error() {
        let mut provider = passthrough_provider();

        provider
            .expect_send_message()
            .times(1)
            .returning(|_| Err(MailerError::SendError));

        let result = manager(provider).send_email(minimal_attributes()).await;

        assert!(matches!(result, Err(MailManagerError::SendEmail { .. })));
    }

    #[tokio::test]
    async fn test_send_email_invalid_template_is_not_sent() {
        let mut provider = MockMailProvider::new();

        provider.expect_create_message().times(0);
        provider.expect_send_message().times(0);

        let result = manager(provider)
            .send_email(EmailAttributes::new().subject("No body"))
            .await;

        assert!(matches!(
            result,
            Err(MailManagerError::InvalidEmailTemplate(_))
        ));
    }

    #[tokio::test]
    async fn test_send_emails_validates_everything_before_sending() {
        let mut provider = MockMailProvider::new();

        provider.expect_create_message().times(0);
        provider.expect_send_message().times(0);

        let result = manager(provider)
            .send_emails(vec![
                minimal_attributes(),
                minimal_attributes().subject(""),
            ])
            .await;

        assert!(matches!(
            result,
            Err(MailManagerError::InvalidEmailTemplate(_))
        ));
    }

    #[tokio::test]
    async fn test_send_emails_keeps_sending_after_a_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut provider = passthrough_provider();

        provider.expect_send_message().times(3).returning(move |_| {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Err(MailerError::SendError),
                _ => Ok(accepted()),
            }
        });

        let result = manager(provider)
            .send_emails(vec![
                minimal_attributes(),
                minimal_attributes(),
                minimal_attributes(),
            ])
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(MailManagerError::SendEmail {
                failed: 1,
                total: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_send_emails_success() -> TestResult {
        let mut provider = passthrough_provider();

        provider
            .expect_send_message()
            .times(2)
            .returning(|_| Ok(accepted()));

        let reports = manager(provider)
            .send_emails(vec![minimal_attributes(), minimal_attributes()])
            .await?;

        assert_eq!(reports.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_send_emails_empty_list() -> TestResult {
        let reports = manager(MockMailProvider::new()).send_emails(Vec::new()).await?;

        assert!(reports.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_send_envelope() -> TestResult {
        let mut provider = MockMailProvider::new();

        provider.expect_kind().return_const(ProviderKind::Sendgrid);
        provider
            .expect_create_message()
            .withf(|email| email.subject == "Welcome" && email.html.contains("Hello Ada"))
            .times(1)
            .returning(|email| Ok(email.clone()));
        provider
            .expect_send_message()
            .times(1)
            .returning(|_| Ok(accepted()));

        let envelope = TemplateEnvelope::new(
            "Welcome",
            GreetingTemplate {
                name: "Ada".to_string(),
            },
        );

        let report = manager(provider)
            .send_envelope(&envelope, vec![RecipientAttributes::new("ada@example.com")])
            .await?;

        assert!(report.is_success());

        Ok(())
    }
}
