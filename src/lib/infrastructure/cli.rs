//! JSON front end used by the `mailmanager` binary

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::domain::communication::{
    mail_manager::{EmailAttributes, MailService},
    mailer::DeliveryReport,
};

/// Sends the email(s) described by a JSON document.
///
/// An object is sent with [`MailService::send_email`], an array with
/// [`MailService::send_emails`].
pub async fn send_json<S: MailService>(service: &S, input: &str) -> Result<Vec<DeliveryReport>> {
    let document: Value = serde_json::from_str(input).context("input is not valid JSON")?;

    match document {
        Value::Array(items) => {
            let emails = items
                .into_iter()
                .map(serde_json::from_value::<EmailAttributes>)
                .collect::<Result<Vec<_>, _>>()
                .context("invalid email attributes")?;

            debug!(count = emails.len(), "sending emails");

            Ok(service.send_emails(emails).await?)
        }
        Value::Object(_) => {
            let email: EmailAttributes =
                serde_json::from_value(document).context("invalid email attributes")?;

            Ok(vec![service.send_email(email).await?])
        }
        _ => anyhow::bail!("expected a JSON object or array of objects"),
    }
}
