use chrono::Local;
use clap::Parser;
use mushaf::{cli::Cli, info_time, Result};
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let start_time = Local::now();
    mushaf::cli::run(cli).await?;
    info_time!(start_time, "Full program time:");

    Ok(())
}
