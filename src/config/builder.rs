//! Default configuration file creation.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::constants::*;
use crate::common::utils::private_path;

/// Write a commented default `salat.toml` at `path`.
///
/// Every setting is commented out so that defaults keep tracking the binary;
/// users uncomment what they want to pin.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let content = default_config_content();
    fs::write(path, content)
        .with_context(|| format!("Failed to write default config to {}", private_path(path)))?;

    log_block_start!("Created default configuration");
    log_indented!("{}", private_path(path));
    Ok(())
}

pub(crate) fn default_config_content() -> String {
    ConfigBuilder::new()
        .add_section("Location")
        .add_commented_setting("latitude", "30.0444", "Fixed latitude (-90 to 90)")
        .add_commented_setting("longitude", "31.2357", "Fixed longitude (-180 to 180)")
        .add_commented_setting(
            "location_file",
            "\"~/.local/state/salat/location.toml\"",
            "File with latitude/longitude, watched for changes",
        )
        .add_section("Calculation")
        .add_commented_setting("country", "\"EG\"", "ISO country code, skips reverse geocoding")
        .add_commented_setting(
            "method",
            &DEFAULT_METHOD.to_string(),
            &format!("Calculation method (0-{MAXIMUM_METHOD}), skips country lookup"),
        )
        .add_section("Tracking")
        .add_commented_setting(
            "movement_threshold",
            &DEFAULT_MOVEMENT_THRESHOLD.to_string(),
            &format!("Degrees per axis before times are re-resolved (0-{MAXIMUM_MOVEMENT_THRESHOLD}]"),
        )
        .add_commented_setting(
            "cache_precision",
            &DEFAULT_CACHE_PRECISION.to_string(),
            &format!("Decimal places of the cache grid (0-{MAXIMUM_CACHE_PRECISION})"),
        )
        .add_section("Services")
        .add_commented_setting("api_url", &format!("\"{DEFAULT_API_URL}\""), "Prayer times API")
        .add_commented_setting(
            "geocoder_url",
            &format!("\"{DEFAULT_GEOCODER_URL}\""),
            "Reverse geocoding API",
        )
        .add_commented_setting(
            "request_timeout",
            &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
            &format!(
                "Seconds ({MINIMUM_REQUEST_TIMEOUT_SECS}-{MAXIMUM_REQUEST_TIMEOUT_SECS})"
            ),
        )
        .add_section("Widget")
        .add_commented_setting(
            "widget_dir",
            "\"~/.local/share/salat/shared\"",
            "Shared store read by the widget",
        )
        .add_commented_setting(
            "sound",
            &format!("\"{DEFAULT_SOUND_ID}\""),
            "Notification sound id",
        )
        .build()
}

struct ConfigBuilder {
    entries: Vec<EntryType>,
}

enum EntryType {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(EntryType::Section(format!("#[{title}]")));
        self
    }

    fn add_commented_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(EntryType::Setting {
            line: format!("# {key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        // Align all comments one space past the longest setting line
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                EntryType::Setting { line, .. } => Some(line.chars().count()),
                EntryType::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        let mut first_section = true;

        for entry in self.entries {
            match entry {
                EntryType::Section(title) => {
                    if !first_section {
                        result.push(String::new());
                    }
                    result.push(title);
                    first_section = false;
                }
                EntryType::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.chars().count());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        result.push(String::new());
        result.join("\n")
    }
}
