use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = commands::node_config(&cli)?;

    let default_level = match &config {
        Some(config) => config.log_level.as_str(),
        None if cli.verbose => "debug",
        None => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    commands::run_command(cli, config).await
}
