//! Message participants

use std::fmt;

use super::EmailAddress;

/// A recipient of an email, with an optional display name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    /// The recipient's address
    pub email: EmailAddress,

    /// The recipient's display name
    pub name: Option<String>,
}

impl Recipient {
    /// Creates a new recipient
    pub fn new(email: EmailAddress, name: Option<String>) -> Self {
        Self { email, name }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

/// The sender of an email
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    /// The sender's address
    pub email: EmailAddress,

    /// The sender's display name
    pub name: String,
}

impl Sender {
    /// Creates a new sender
    pub fn new(email: EmailAddress, name: impl Into<String>) -> Self {
        Self {
            email,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_display_with_name() {
        let recipient = Recipient::new(
            EmailAddress::new_unchecked("test1@example.com"),
            Some("Test".to_string()),
        );

        assert_eq!(recipient.to_string(), "Test <test1@example.com>");
    }

    #[test]
    fn test_recipient_display_without_name() {
        let recipient = Recipient::new(EmailAddress::new_unchecked("test2@example.com"), None);

        assert_eq!(recipient.to_string(), "test2@example.com");
    }
}
