mod auth;
mod cli;
mod config;
mod error;
mod output;
mod providers;
mod records;
mod server;
mod staleness;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting pipescope - Azure DevOps pipeline report");
    cli.execute().await?;

    Ok(())
}
