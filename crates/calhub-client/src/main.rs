//! calhub CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use calhub_client::cli::{Cli, Command, ConfigAction};
use calhub_client::commands::{self, Session};
use calhub_client::config::ClientConfig;
use calhub_client::error::ClientResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let path: PathBuf = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = if cli.config.is_some() {
        ClientConfig::load_from(&path)?
    } else {
        ClientConfig::load()?
    };

    calhub_core::init_tracing(config.logging.tracing_config(cli.debug)?)?;

    let Some(command) = cli.command else {
        let session = Session::open(&config).await?;
        return commands::appointments::run(&session, None, cli.json).await;
    };

    match command {
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&path),
        },
        Command::Calendars => {
            let session = Session::open(&config).await?;
            commands::calendars::run(&session, cli.json).await
        }
        Command::Appointments { calendar } => {
            let session = Session::open(&config).await?;
            commands::appointments::run(&session, calendar.as_deref(), cli.json).await
        }
        Command::Watch { interval } => {
            let session = Session::open(&config).await?;
            let mut sync = config.sync.to_sync_config();
            if let Some(secs) = interval {
                sync.interval = std::time::Duration::from_secs(secs);
            }
            commands::watch::run(&session, sync, cli.json).await
        }
        Command::Add(args) => {
            let session = Session::open(&config).await?;
            commands::mutate::add(&session, args, cli.json).await
        }
        Command::Remove { id } => {
            let session = Session::open(&config).await?;
            commands::mutate::remove(&session, &id, cli.json).await
        }
    }
}
