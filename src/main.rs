use anyhow::Result;
use clap::Parser;
use climate_chat::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    climate_chat::run(args).await
}
