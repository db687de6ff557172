//! Infrastructure: concrete providers, configuration and the JSON front end

pub mod cli;
pub mod email;
