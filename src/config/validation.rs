//! Configuration validation.
//!
//! Rejects values the runtime cannot work with. Every message names the field
//! and the accepted range.

use anyhow::Result;

use super::Config;
use crate::common::constants::*;

pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(lat) = config.latitude
        && !(-90.0..=90.0).contains(&lat)
    {
        anyhow::bail!("latitude must be between -90 and 90 degrees (got {})", lat);
    }

    if let Some(lon) = config.longitude
        && !(-180.0..=180.0).contains(&lon)
    {
        anyhow::bail!(
            "longitude must be between -180 and 180 degrees (got {})",
            lon
        );
    }

    if config.latitude.is_some() != config.longitude.is_some() {
        anyhow::bail!("latitude and longitude must be set together");
    }

    if let Some(threshold) = config.movement_threshold
        && !(threshold > MINIMUM_MOVEMENT_THRESHOLD && threshold <= MAXIMUM_MOVEMENT_THRESHOLD)
    {
        anyhow::bail!(
            "movement_threshold ({}) must be greater than {} and at most {} degrees",
            threshold,
            MINIMUM_MOVEMENT_THRESHOLD,
            MAXIMUM_MOVEMENT_THRESHOLD
        );
    }

    if let Some(precision) = config.cache_precision
        && precision > MAXIMUM_CACHE_PRECISION
    {
        anyhow::bail!(
            "cache_precision ({}) must be between 0 and {} decimal places",
            precision,
            MAXIMUM_CACHE_PRECISION
        );
    }

    if let Some(timeout) = config.request_timeout
        && !(MINIMUM_REQUEST_TIMEOUT_SECS..=MAXIMUM_REQUEST_TIMEOUT_SECS).contains(&timeout)
    {
        anyhow::bail!(
            "request_timeout ({}s) must be between {} and {} seconds",
            timeout,
            MINIMUM_REQUEST_TIMEOUT_SECS,
            MAXIMUM_REQUEST_TIMEOUT_SECS
        );
    }

    if let Some(country) = &config.country
        && !(country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic()))
    {
        anyhow::bail!(
            "country must be a two-letter ISO code such as \"EG\" (got \"{}\")",
            country
        );
    }

    if let Some(method) = config.method
        && method > MAXIMUM_METHOD
    {
        anyhow::bail!("method ({}) must be between 0 and {}", method, MAXIMUM_METHOD);
    }

    for (field, url) in [("api_url", &config.api_url), ("geocoder_url", &config.geocoder_url)] {
        if let Some(url) = url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            anyhow::bail!("{} must be an http(s) URL (got \"{}\")", field, url);
        }
    }

    if let Some(sound) = &config.sound
        && sound.trim().is_empty()
    {
        anyhow::bail!("sound must not be empty");
    }

    Ok(())
}
