//! Mail manager module: the provider-agnostic send pipeline.

mod attributes;
mod errors;
mod service;

pub use attributes::{
    AttachmentAttributes, EmailAttributes, RecipientAttributes, SenderDefaults,
    DEFAULT_FROM_EMAIL, DEFAULT_FROM_NAME,
};
pub use errors::MailManagerError;
pub use service::{MailManager, MailService};
