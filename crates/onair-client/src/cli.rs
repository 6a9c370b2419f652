//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// onair - switch things on when you are on a call
#[derive(Debug, Parser)]
#[command(name = "onair")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "ONAIR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log format: pretty, compact or json
    #[arg(long, global = true, env = "ONAIR_LOG_FORMAT")]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the monitor in the foreground
    Run,

    /// Show whether a monitor is running and what it is tracking
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "onair",
            "run",
            "--debug",
            "--log-format",
            "json",
            "--config",
            "/tmp/onair.toml",
        ])
        .unwrap();

        assert!(matches!(cli.command, Command::Run));
        assert!(cli.debug);
        assert_eq!(cli.log_format.as_deref(), Some("json"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/onair.toml")));
    }

    #[test]
    fn parses_config_actions() {
        let cli = Cli::try_parse_from(["onair", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Validate
            }
        ));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["onair"]).is_err());
    }
}
