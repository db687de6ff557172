//! Envelopes: templated message bodies handed to the mail manager

use askama::Template;
use css_inline::InlineError;
use thiserror::Error;
use tracing::debug;

use crate::domain::communication::mail_manager::{EmailAttributes, RecipientAttributes};

/// Errors that can occur while rendering an envelope
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The template could not be rendered
    #[error("could not render email template: {0}")]
    Render(#[from] askama::Error),

    /// The rendered HTML could not have its CSS inlined
    #[error("could not inline email styles: {0}")]
    Inline(#[from] InlineError),
}

/// A templated email body together with its subject
pub trait Envelope: Send + Sync {
    /// The subject line of the email
    fn subject(&self) -> String;

    /// Renders the HTML body
    fn render_html(&self) -> Result<String, EnvelopeError>;

    /// Sender address and name, when the envelope overrides the defaults
    fn sender(&self) -> Option<(String, String)> {
        None
    }

    /// Renders the envelope into [`EmailAttributes`] addressed to `recipients`.
    /// `<style>` blocks in the rendered HTML are inlined into `style` attributes.
    fn to_attributes(
        &self,
        recipients: Vec<RecipientAttributes>,
    ) -> Result<EmailAttributes, EnvelopeError> {
        let html = css_inline::inline(&self.render_html()?)?;

        debug!("rendered envelope ({} bytes)", html.len());

        let mut attributes = EmailAttributes::new()
            .subject(self.subject())
            .html_part(html);

        if let Some((email, name)) = self.sender() {
            attributes = attributes.sender(email, name);
        }

        attributes.recipients = Some(recipients);

        Ok(attributes)
    }
}

/// Wraps any askama [`Template`] as an [`Envelope`]
#[derive(Debug)]
pub struct TemplateEnvelope<T: Template> {
    subject: String,
    template: T,
}

impl<T: Template> TemplateEnvelope<T> {
    /// Creates a new envelope from a subject and a template
    pub fn new(subject: impl Into<String>, template: T) -> Self {
        Self {
            subject: subject.into(),
            template,
        }
    }
}

impl<T> Envelope for TemplateEnvelope<T>
where
    T: Template + Send + Sync,
{
    fn subject(&self) -> String {
        self.subject.clone()
    }

    fn render_html(&self) -> Result<String, EnvelopeError> {
        Ok(self.template.render()?)
    }
}
