mod auth;
mod cli;
mod config;
mod error;
mod model;
mod output;
mod providers;
mod shutdown;
mod state;
mod watch;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting gha-watch - GitHub Actions watcher");
    cli.execute().await?;

    Ok(())
}
