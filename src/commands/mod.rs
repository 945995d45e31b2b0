//! Command handlers.
//!
//! Each command lives in its own submodule. The helpers here assemble the
//! pieces every command needs from the configuration: the clock, the prayer
//! time service and the location source.

pub mod method;
pub mod next;
pub mod run;
pub mod status;
pub mod times;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::args::GlobalOptions;
use crate::config::{self, Config};
use crate::geo::{Coordinate, Geocoder, NominatimGeocoder, StaticGeocoder};
use crate::location::{FileLocation, FixedLocation, LocationProvider};
use crate::prayer::aladhan::AladhanClient;
use crate::prayer::cache::FileStore;
use crate::prayer::{PrayerCache, PrayerTimeService};
use crate::time_source::{self, OffsetTimeSource, TimeSource};

/// Apply `--config` and load the configuration.
pub fn load_config(options: &GlobalOptions) -> Result<Config> {
    if options.config_dir.is_some() {
        config::set_config_dir(options.config_dir.clone())?;
    }
    Config::load()
}

/// Install and return the process clock, honouring `--at`.
pub fn init_clock(options: &GlobalOptions) -> Result<Arc<dyn TimeSource>> {
    if let Some(at) = &options.at {
        let start = time_source::parse_datetime(at).map_err(anyhow::Error::msg)?;
        time_source::init_time_source(Arc::new(OffsetTimeSource::starting_at(start)));
    }
    Ok(time_source::global())
}

/// Build the prayer time service from configuration.
pub fn build_service(
    config: &Config,
    clock: Arc<dyn TimeSource>,
    debug_enabled: bool,
) -> Result<PrayerTimeService> {
    let geocoder: Arc<dyn Geocoder> = match &config.country {
        Some(country) => Arc::new(StaticGeocoder::new(Some(country.clone()))),
        None => Arc::new(
            NominatimGeocoder::new(config.geocoder_url(), config.request_timeout())
                .context("Failed to set up reverse geocoder")?,
        ),
    };

    let timings = Arc::new(
        AladhanClient::new(config.api_url(), config.request_timeout())
            .context("Failed to set up prayer times client")?,
    );

    let store = FileStore::default_location().context("Failed to open prayer time cache")?;
    let cache = PrayerCache::new(Arc::new(store), config.cache_precision());

    Ok(PrayerTimeService::new(geocoder, timings, cache, clock)
        .with_method_override(config.method_override())
        .with_debug(debug_enabled))
}

/// Pick the location source: `--lat/--lon`, then `location_file`, then the
/// configured coordinate.
pub fn location_provider(
    config: &Config,
    options: &GlobalOptions,
) -> Result<Arc<dyn LocationProvider>> {
    if let Some((lat, lon)) = options.location {
        return Ok(Arc::new(FixedLocation::new(Coordinate::new(lat, lon))));
    }
    if let Some(file) = &config.location_file {
        return Ok(Arc::new(
            FileLocation::new(file.clone()).with_debug(options.debug_enabled),
        ));
    }
    if let Some(coordinate) = config.fixed_coordinate() {
        return Ok(Arc::new(FixedLocation::new(coordinate)));
    }

    anyhow::bail!(
        "No location configured. Set latitude/longitude or location_file in salat.toml, \
         or pass --lat and --lon"
    )
}

/// One coordinate for one-shot commands.
pub fn current_coordinate(config: &Config, options: &GlobalOptions) -> Result<Coordinate> {
    let provider = location_provider(config, options)?;
    if !provider.request_permissions().foreground {
        anyhow::bail!(crate::common::constants::PERMISSION_ERROR_MESSAGE);
    }
    provider
        .current_fix()
        .context(crate::common::constants::LOCATION_ERROR_MESSAGE)
}
