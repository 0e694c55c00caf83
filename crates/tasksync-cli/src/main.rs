mod app;
mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tasksync_core::config::config_path;
use tasksync_core::{Config, TaskPatch};

use crate::app::App;

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_path()?,
    };
    let config = Config::load_or_init(&config_path)?;

    // Commands that only touch the config file
    match &cli.command {
        Commands::Login { user_id } => {
            return cli::commands::login(&config_path, config, user_id, cli.json);
        }
        Commands::Logout => return cli::commands::logout(&config_path, config, cli.json),
        _ => {}
    }

    let app = App::open(&config, cli.offline).await?;

    let result = match &cli.command {
        Commands::Add {
            title,
            description,
            priority,
            due,
        } => {
            cli::commands::add_task(
                &app,
                title,
                description.clone(),
                *priority,
                due.as_deref(),
                cli.json,
            )
            .await
        }
        Commands::List { filter, sort } => {
            cli::commands::list_tasks(&app, *filter, *sort, cli.json)
        }
        Commands::Edit {
            id,
            title,
            description,
            priority,
            due,
            clear_due,
        } => {
            let patch = TaskPatch {
                title: title.clone(),
                description: description.clone(),
                priority: *priority,
                ..Default::default()
            };
            cli::commands::edit_task(&app, id, patch, due.as_deref(), *clear_due, cli.json).await
        }
        Commands::Done { id } => cli::commands::toggle_task(&app, id, cli.json).await,
        Commands::Rm { id } => cli::commands::remove_task(&app, id, cli.json).await,
        Commands::Sync => cli::commands::sync_now(&app, cli.json).await,
        Commands::Status => cli::commands::status(&app, cli.json),
        Commands::Login { .. } | Commands::Logout => Ok(()),
    };

    // Detached remote deletes must land before the runtime goes away
    app.service.flush_background().await;
    result
}
