use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gator::app::ExecutionState;
use gator::cli::{self, Cli};
use gator::config::{Config, JsonConfigStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gator=info")))
        .init();

    let cli = Cli::parse();
    let command = cli.command()?;

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_config_path()?,
    };
    let mut state = ExecutionState::open(Box::new(JsonConfigStore::new(config_path)))?;

    cli::router().run(&mut state, &command).await?;

    Ok(())
}
