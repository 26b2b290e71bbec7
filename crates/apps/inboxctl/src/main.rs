//! inboxctl - inbox authentication from the command line
//!
//! This is the main entry point for the inboxctl tool.

use clap::Parser;
use log::error;

mod cli;
mod observer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let cli = cli::Cli::parse();
    cli::run(cli).await
}
