//! Prayer events and the resolution pipeline that produces them.
//!
//! ## Module Structure
//!
//! - [`method`]: country code → calculation method
//! - [`cache`]: day-and-location scoped persistence of a resolved day
//! - [`aladhan`]: remote computation of a day's timings
//! - [`service`]: orchestration of geocoding, method choice, cache and fetch
//! - [`selector`]: the single upcoming prayer for a given instant
//!
//! A day of prayers is always the five canonical prayers in [`PrayerName::ALL`]
//! order. Every [`PrayerEvent`] carries an instant anchored to the calendar day
//! it was produced for; constructors take that day explicitly and never look
//! at the clock.

pub mod aladhan;
pub mod cache;
pub mod method;
pub mod selector;
pub mod service;

pub use cache::PrayerCache;
pub use method::{CalculationMethod, resolve_method};
pub use selector::select_next;
pub use service::{PrayerTimeService, Resolution};

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The five daily prayers, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerName {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    /// Canonical order. This is the only valid iteration order for a day.
    pub const ALL: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    /// Stable lowercase identifier.
    pub fn id(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "fajr",
            PrayerName::Dhuhr => "dhuhr",
            PrayerName::Asr => "asr",
            PrayerName::Maghrib => "maghrib",
            PrayerName::Isha => "isha",
        }
    }

    /// Display label, also the key used by the remote timings payload.
    pub fn label(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TimeParseError {
    #[error("'{0}' is not an HH:MM time")]
    Malformed(String),
}

/// One prayer on one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct PrayerEvent {
    pub name: PrayerName,
    /// "HH:MM", 24h local.
    pub time: String,
    /// `time` on the day this event was computed for.
    pub instant: DateTime<Local>,
}

impl PrayerEvent {
    /// Build an event for `day`. The instant is anchored to `day`, never to "now".
    pub fn new(name: PrayerName, time: NaiveTime, day: NaiveDate) -> Self {
        Self {
            name,
            time: time.format("%H:%M").to_string(),
            instant: anchor(day, time),
        }
    }

    /// Build an event from a raw remote time string such as `"05:12 (EET)"`.
    pub fn from_raw(name: PrayerName, raw: &str, day: NaiveDate) -> Result<Self, TimeParseError> {
        let time = parse_clock(&normalize_raw_time(raw))?;
        Ok(Self::new(name, time, day))
    }

    pub fn id(&self) -> &'static str {
        self.name.id()
    }

    pub fn label(&self) -> &'static str {
        self.name.label()
    }

    pub fn day(&self) -> NaiveDate {
        self.instant.date_naive()
    }
}

static ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(.*\)").expect("annotation pattern compiles"));

/// Strip a trailing parenthetical annotation and keep the leading `HH:MM`.
pub fn normalize_raw_time(raw: &str) -> String {
    let stripped = ANNOTATION.replace(raw, "");
    stripped.trim().chars().take(5).collect()
}

/// Parse a 24h `HH:MM` clock time.
pub fn parse_clock(time: &str) -> Result<NaiveTime, TimeParseError> {
    NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| TimeParseError::Malformed(time.to_string()))
}

/// Place `time` on `day` in the local timezone.
///
/// Ambiguous wall times (DST fall-back) take the earlier instant; wall times
/// inside a DST gap are shifted forward by the gap.
pub fn anchor(day: NaiveDate, time: NaiveTime) -> DateTime<Local> {
    let naive = day.and_time(time);
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let shifted = naive + chrono::Duration::hours(1);
            Local
                .from_local_datetime(&shifted)
                .earliest()
                .unwrap_or_else(|| Local.from_utc_datetime(&naive))
        }
    }
}

/// True when `events` are exactly the five canonical prayers in canonical order.
pub fn is_canonical_day(events: &[PrayerEvent]) -> bool {
    events.len() == PrayerName::ALL.len()
        && events
            .iter()
            .zip(PrayerName::ALL)
            .all(|(event, name)| event.name == name)
}
