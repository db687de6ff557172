//! Communication domain: addresses, envelopes, providers and the mail manager.

pub mod email_addresses;
pub mod envelope;
pub mod mail_manager;
pub mod mailer;
