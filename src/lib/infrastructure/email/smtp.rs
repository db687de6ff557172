//! SMTP provider

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use lettre::{
    message::{header::ContentType, Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use crate::domain::communication::mailer::{
    DeliveryReport, Email, MailProvider, MailerError, ProviderKind,
};

/// Connection timeout for SMTP sessions
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP configuration
#[derive(Clone, Default, Debug, Parser)]
pub struct SMTPConfig {
    /// The SMTP host
    #[clap(long = "smtp-host", env = "SMTP_HOST")]
    pub host: Option<String>,

    /// The SMTP port
    #[clap(long = "smtp-port", env = "SMTP_PORT", default_value = "25")]
    pub port: u16,

    /// The SMTP login; no authentication is attempted when empty
    #[clap(long = "smtp-login", env = "SMTP_LOGIN", default_value = "")]
    pub login: String,

    /// The SMTP password
    #[clap(
        long = "smtp-password",
        env = "SMTP_PASSWORD",
        default_value = "",
        hide_env_values = true
    )]
    pub password: String,

    /// Upgrade the connection with STARTTLS
    #[clap(long = "smtp-tls", env = "SMTP_TLS")]
    pub tls: bool,

    /// Connect with implicit TLS (SMTPS)
    #[clap(long = "smtp-smtps", env = "SMTP_SMTPS")]
    pub smtps: bool,
}

/// SMTP provider
#[derive(Clone)]
pub struct SmtpProvider {
    host: String,
    port: u16,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpProvider {
    /// Creates a new SMTP provider connecting to `host`.
    ///
    /// No connection is opened until the first message is sent.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime: the transport's connection
    /// pool spawns its cleanup task when it is built.
    pub fn new(host: &str, config: &SMTPConfig) -> Result<Self> {
        let builder = if config.smtps {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .with_context(|| format!("invalid SMTPS relay {host}"))?
        } else if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .with_context(|| format!("invalid STARTTLS relay {host}"))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let mut builder = builder.port(config.port).timeout(Some(SMTP_TIMEOUT));

        if !config.login.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.login.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            host: host.to_string(),
            port: config.port,
            transport: builder.build(),
        })
    }
}

impl fmt::Debug for SmtpProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpProvider")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("transport", &"AsyncSmtpTransport")
            .finish()
    }
}

#[async_trait]
impl MailProvider for SmtpProvider {
    type Message = Message;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Smtp
    }

    fn create_message(&self, email: &Email) -> Result<Message, MailerError> {
        let mut builder = Message::builder()
            .from(Mailbox::new(
                Some(email.from.name.clone()),
                email.from.email.as_str().parse()?,
            ))
            .subject(email.subject.clone());

        for recipient in &email.recipients {
            builder = builder.to(Mailbox::new(
                recipient.name.clone(),
                recipient.email.as_str().parse()?,
            ));
        }

        let html = SinglePart::html(email.html.clone());

        if email.attachments.is_empty() {
            return Ok(builder.singlepart(html)?);
        }

        let mut parts = MultiPart::mixed().singlepart(html);

        for attachment in &email.attachments {
            // The disposition is not carried over; every file is a regular attachment.
            let content_type = ContentType::parse(
                attachment
                    .content_type
                    .as_deref()
                    .unwrap_or("application/octet-stream"),
            )
            .map_err(|e| MailerError::InvalidAttachment(format!("{}: {e}", attachment.filename)))?;

            parts = parts.singlepart(
                MimeAttachment::new(attachment.filename.clone())
                    .body(attachment.decoded_content()?, content_type),
            );
        }

        Ok(builder.multipart(parts)?)
    }

    async fn send_message(&self, message: Message) -> Result<DeliveryReport, MailerError> {
        debug!(host = %self.host, port = self.port, "sending message over SMTP");

        let response = self.transport.send(message).await?;

        Ok(DeliveryReport::new(
            ProviderKind::Smtp,
            response.code().to_string().parse().ok(),
            response.first_line().map(str::to_string),
        ))
    }
}
