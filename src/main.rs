use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use gitsync::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    cli.run().await
}
