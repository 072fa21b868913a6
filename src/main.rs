use clap::Parser;

use workspace_watch::cli::commands;
use workspace_watch::cli::{Cli, Commands};
use workspace_watch::config::Settings;
use workspace_watch::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    logging::init_with_config(&settings.logging);

    match &cli.command {
        Commands::Init { force } => commands::init::run_init(*force),
        Commands::Config => commands::init::run_config(&settings),
        Commands::Resolve { workspace } => commands::resolve::run(workspace),
        Commands::Files { workspace, json } => commands::files::run(workspace, *json, &settings),
        Commands::Watch { workspace, json } => {
            commands::watch::run(workspace, *json, &settings).await
        }
    }
}
