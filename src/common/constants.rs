//! Application-wide defaults and limits.

use std::time::Duration;

// # Calculation method

/// Muslim World League. Used for any country without an explicit mapping.
pub const DEFAULT_METHOD: u8 = 3;
pub const MAXIMUM_METHOD: u8 = 99;

// # Location tracking

/// Per-axis movement (degrees) below which a new fix is treated as jitter.
pub const DEFAULT_MOVEMENT_THRESHOLD: f64 = 0.1;
pub const MINIMUM_MOVEMENT_THRESHOLD: f64 = 0.0;
pub const MAXIMUM_MOVEMENT_THRESHOLD: f64 = 10.0;

// # Cache

/// Decimal places kept in cache keys; 2 places is roughly a 1.1 km grid.
pub const DEFAULT_CACHE_PRECISION: usize = 2;
pub const MAXIMUM_CACHE_PRECISION: usize = 6;
pub const CACHE_KEY_PREFIX: &str = "prayers";

// # Remote collaborators

pub const DEFAULT_API_URL: &str = "https://api.aladhan.com";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const MINIMUM_REQUEST_TIMEOUT_SECS: u64 = 1;
pub const MAXIMUM_REQUEST_TIMEOUT_SECS: u64 = 300;
pub const USER_AGENT: &str = concat!("salat/", env!("CARGO_PKG_VERSION"));

// # Widget bridge

/// Key under which the widget reads its payload from the shared store.
pub const WIDGET_DATA_KEY: &str = "ramadan_widget_data";

// # Presentation

pub const DEFAULT_SOUND_ID: &str = "adhan_mecca";
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
pub const COUNTDOWN_PLACEHOLDER: &str = "--:--:--";

// # User-facing error messages

pub const LOCATION_ERROR_MESSAGE: &str = "Could not get location. Showing default times.";
pub const PERMISSION_ERROR_MESSAGE: &str = "Allow location access to load prayer times.";
pub const FETCH_ERROR_MESSAGE: &str = "Could not load prayer times. Showing last known times.";

// # Exit codes

pub const EXIT_FAILURE: i32 = 1;

#[cfg(any(test, feature = "testing-support"))]
pub mod test_constants {
    /// Cairo, used across tests as a mapped-country location.
    pub const CAIRO: (f64, f64) = (30.0444, 31.2357);
    /// London, an unmapped country that falls back to the default method.
    pub const LONDON: (f64, f64) = (51.5074, -0.1278);
}
