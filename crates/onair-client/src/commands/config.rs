//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, source: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", source.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
///
/// Checks timings and that the probe and actuator commands are set.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.daemon_config()?;
    config.probe_command()?;
    config.actuator_command()?;
    if config.calendar_command()?.is_none() {
        println!("No calendar command configured; meeting warnings are disabled.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(source: &Path) -> ClientResult<()> {
    println!("config: {}", source.display());
    Ok(())
}
