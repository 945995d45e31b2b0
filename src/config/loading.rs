//! Configuration loading.
//!
//! Resolves the config path (custom directory or the XDG default), creates a
//! commented default file on first run, then parses, normalizes and validates.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::Config;
use super::validation::validate_config;
use crate::common::utils::{expand_tilde, private_path};

pub const CONFIG_FILE_NAME: &str = "salat.toml";

/// Global configuration directory, set once at startup
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Set the configuration directory for the current process.
/// Can only be called once; later calls are an error.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(|d| expand_tilde(Path::new(&d))))
        .map_err(|_| anyhow::anyhow!("Configuration directory already set"))
}

/// The custom configuration directory, if one was set.
pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().and_then(|d| d.clone())
}

/// Path of `salat.toml`, whether or not it exists yet.
pub fn get_config_path() -> Result<PathBuf> {
    if let Some(custom_dir) = get_custom_config_dir() {
        return Ok(custom_dir.join(CONFIG_FILE_NAME));
    }

    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join("salat").join(CONFIG_FILE_NAME))
}

/// Load the configuration, creating a default file if none exists.
pub fn load() -> Result<Config> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        super::builder::create_default_config(&config_path)
            .context("Failed to create default config during load")?;
    }

    load_from_path(&config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            private_path(&config_path)
        )
    })
}

/// Load configuration from a specific path. Never creates the file.
pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!(
            "Configuration file not found at {}",
            private_path(path)
        );
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", private_path(path)))?;

    parse_config(&content)
        .with_context(|| format!("Invalid configuration in {}", private_path(path)))
}

/// Parse, normalize and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(content).context("Failed to parse TOML")?;
    apply_modifications(&mut config);
    validate_config(&config)?;
    Ok(config)
}

/// Normalize values without judging them; validation runs afterwards.
fn apply_modifications(config: &mut Config) {
    config.location_file = config.location_file.as_deref().map(expand_tilde);
    config.widget_dir = config.widget_dir.as_deref().map(expand_tilde);

    if let Some(country) = config.country.take() {
        let country = country.trim().to_ascii_uppercase();
        if !country.is_empty() {
            config.country = Some(country);
        }
    }

    for url in [&mut config.api_url, &mut config.geocoder_url]
        .into_iter()
        .flatten()
    {
        while url.ends_with('/') {
            url.pop();
        }
    }
}
