//! cryptopulse command-line entry point.

use anyhow::Result;
use clap::Parser;
use cryptopulse::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; API keys may come from the real environment
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    cli.execute().await
}
