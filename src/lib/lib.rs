#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Provider-agnostic transactional email: SendGrid or SMTP behind one mail manager

pub mod domain;
pub mod infrastructure;
