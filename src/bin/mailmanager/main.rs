#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Command-line front end: sends the email(s) described by a JSON document

use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use mailmanager::infrastructure::{cli::send_json, email::MailerConfig};
use tracing_subscriber::EnvFilter;

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// The mailer configuration
    #[clap(flatten)]
    pub mailer: MailerConfig,

    /// JSON file holding one email object or an array of them; stdin when omitted or `-`
    pub input: Option<PathBuf>,
}

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load environment: {}", e);

            return Err(e.into());
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let manager = args.mailer.mail_manager()?;
    let input = read_input(args.input)?;

    for report in send_json(&manager, &input).await? {
        println!("{report}");
    }

    Ok(())
}

#[mutants::skip]
fn read_input(path: Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;

            Ok(input)
        }
    }
}
