//! Configuration for salat.
//!
//! Settings live in `salat.toml` under `$XDG_CONFIG_HOME/salat/` (or the
//! directory given with `--config`). Every field is optional:
//!
//! ```toml
//! #[Location]
//! latitude = 30.0444              # Fixed latitude (-90 to 90)
//! longitude = 31.2357             # Fixed longitude (-180 to 180)
//! location_file = "~/.local/state/location.toml"  # Watched file with latitude/longitude
//!
//! #[Calculation]
//! country = "EG"                  # ISO country code, skips reverse geocoding
//! method = 5                      # Calculation method, skips country lookup
//!
//! #[Tracking]
//! movement_threshold = 0.1        # Degrees per axis before times are re-resolved
//! cache_precision = 2             # Decimal places of the cache grid
//!
//! #[Services]
//! api_url = "https://api.aladhan.com"
//! geocoder_url = "https://nominatim.openstreetmap.org"
//! request_timeout = 15            # Seconds
//!
//! #[Widget]
//! widget_dir = "~/.local/share/salat/shared"
//! sound = "adhan_mecca"
//! ```
//!
//! Loading fills unset fields with defaults and validates the result; an
//! invalid file is an error, never silently corrected.

pub mod builder;
pub mod loading;
pub mod validation;

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::constants::*;
use crate::common::utils::{format_coordinates, private_path};
use crate::geo::Coordinate;
use crate::prayer::CalculationMethod;

pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_file: Option<PathBuf>,
    pub country: Option<String>,
    pub method: Option<u8>,
    pub movement_threshold: Option<f64>,
    pub cache_precision: Option<usize>,
    pub api_url: Option<String>,
    pub geocoder_url: Option<String>,
    pub request_timeout: Option<u64>, // seconds
    pub widget_dir: Option<PathBuf>,
    pub sound: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        load_from_path(path)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        get_config_path()
    }

    /// Configured fixed coordinate, if both halves are present.
    pub fn fixed_coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }

    pub fn method_override(&self) -> Option<CalculationMethod> {
        self.method.map(CalculationMethod)
    }

    pub fn movement_threshold(&self) -> f64 {
        self.movement_threshold.unwrap_or(DEFAULT_MOVEMENT_THRESHOLD)
    }

    pub fn cache_precision(&self) -> usize {
        self.cache_precision.unwrap_or(DEFAULT_CACHE_PRECISION)
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn geocoder_url(&self) -> &str {
        self.geocoder_url.as_deref().unwrap_or(DEFAULT_GEOCODER_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn sound(&self) -> &str {
        self.sound.as_deref().unwrap_or(DEFAULT_SOUND_ID)
    }

    /// Shared store directory: the configured one, else the per-user default.
    pub fn widget_dir(&self) -> Option<PathBuf> {
        self.widget_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("salat").join("shared")))
    }

    /// Create the shared store directory when the user configured one explicitly.
    ///
    /// The default location is only used when something else created it.
    pub fn prepare_widget_dir(&self) -> Result<()> {
        if let Some(dir) = &self.widget_dir {
            std::fs::create_dir_all(dir).map_err(|e| {
                anyhow::anyhow!("Failed to create widget directory {}: {e}", private_path(dir))
            })?;
        }
        Ok(())
    }

    pub fn log_config(&self) {
        log_block_start!("Loaded configuration");

        match (&self.location_file, self.fixed_coordinate()) {
            (Some(file), _) => log_indented!("Location: watching {}", private_path(file)),
            (None, Some(c)) => log_indented!(
                "Location: {}",
                format_coordinates(c.latitude, c.longitude)
            ),
            (None, None) => log_indented!("Location: not configured"),
        }

        if let Some(country) = &self.country {
            log_indented!("Country: {country}");
        }
        if let Some(method) = self.method_override() {
            log_indented!("Method: {method} ({})", method.describe());
        }
        log_indented!("Movement threshold: {}°", self.movement_threshold());
        log_indented!("Cache precision: {} decimal places", self.cache_precision());
        log_indented!("Request timeout: {}s", self.request_timeout().as_secs());
        if let Some(dir) = self.widget_dir() {
            log_indented!("Widget store: {}", private_path(&dir));
        }
        log_indented!("Sound: {}", self.sound());
    }
}
