use anyhow::Result;
use clap::Parser;
use moneta::cli::Cli;
use moneta::logging::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    cli.run().await
}
