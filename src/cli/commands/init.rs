//! Init and Config commands.

use std::path::PathBuf;

use anyhow::{Context, bail};

use crate::config::{SETTINGS_DIR, Settings};

/// Run init command - write default settings to `.workspace-watch/settings.toml`.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from(SETTINGS_DIR).join("settings.toml");

    if config_path.exists() && !force {
        bail!(
            "configuration file already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }

    Settings::default()
        .save(&config_path)
        .map_err(|e| anyhow::anyhow!("writing {}: {e}", config_path.display()))?;

    println!("Created configuration file at: {}", config_path.display());
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> anyhow::Result<()> {
    let toml_str = toml::to_string_pretty(config).context("serializing settings")?;
    println!("{toml_str}");
    Ok(())
}
