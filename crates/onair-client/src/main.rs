//! onair CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use onair_client::cli::{Cli, Command, ConfigAction};
use onair_client::config::ClientConfig;
use onair_client::error::ClientResult;
use onair_core::{TracingConfig, TracingOutputFormat, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn setup_tracing(cli: &Cli) -> ClientResult<()> {
    let mut config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::daemon()
    };
    if let Some(format) = &cli.log_format {
        config = config.with_format(format.parse::<TracingOutputFormat>()?);
    }
    init_tracing(config)?;
    Ok(())
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = match cli.config {
        Some(path) => ClientConfig::load_from(&path)?,
        None => ClientConfig::load()?,
    };
    let source = config.source_path();

    match cli.command {
        Command::Run => onair_client::commands::run::run(&config).await,
        Command::Status { json } => onair_client::commands::status::status(&config, json),
        Command::Config { action } => match action {
            ConfigAction::Dump => onair_client::commands::config::dump(&config, &source),
            ConfigAction::Validate => onair_client::commands::config::validate(&config),
            ConfigAction::Path => onair_client::commands::config::path(&source),
        },
    }
}
