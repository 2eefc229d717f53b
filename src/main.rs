//! dotp - Simple TOTP (Time-based One-time Password) utility
//!
//! Derives, validates and live-displays RFC 6238 codes from a base32 secret.

use std::process::ExitCode;

use clap::Parser;

mod cli;

use cli::Cli;

/// Log to stderr so stdout only carries codes, secrets and URIs.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();

    match cli::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
