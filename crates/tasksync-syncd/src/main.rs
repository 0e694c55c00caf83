mod daemon;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tasksync_core::config::{config_path, expand_tilde};
use tasksync_core::Config;

use crate::daemon::Daemon;

#[derive(Parser)]
#[command(name = "tasksync-syncd", about = "Background sync daemon for tasksync")]
struct Args {
    /// Path to the config file (defaults to $TASKSYNC_CONFIG or the platform config dir)
    #[arg(long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    let config_path: PathBuf = match &args.config {
        Some(path) => expand_tilde(path)?,
        None => config_path()?,
    };
    let config = Config::load_or_init(&config_path)?;

    tracing::info!(
        "tasksync-syncd v{} starting with config {}",
        env!("CARGO_PKG_VERSION"),
        config_path.display()
    );

    Daemon::from_config(&config)?.run().await
}
