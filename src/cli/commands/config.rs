//! Config command.

use crate::config::Settings;

/// Display the active configuration, or write it out with `init`.
pub fn run_config(config: &Settings, init: bool, force: bool) -> anyhow::Result<()> {
    if init {
        let path = config
            .init_config_file(force)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("Created configuration file at: {}", path.display());
        println!("Edit this file to customize your settings.");
        return Ok(());
    }

    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
