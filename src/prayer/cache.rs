//! Day-and-location scoped cache of resolved prayer days.
//!
//! Entries are keyed by `(day, lat, lon, method)` with coordinates rounded to
//! a fixed number of decimals, so repeated queries from roughly the same place
//! on the same day share one entry. There is no expiry: an entry simply stops
//! being looked up once the day in its key is no longer today.
//!
//! Only durable fields are persisted. Instants are rebuilt on read by anchoring
//! the stored `HH:MM` to the day in the key.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{CalculationMethod, PrayerEvent, PrayerName, is_canonical_day, parse_clock};
use crate::common::constants::CACHE_KEY_PREFIX;
use crate::geo::Coordinate;

/// String-keyed persistence of serialized payloads.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// `$XDG_CACHE_HOME/salat`, or the platform equivalent.
    pub fn default_location() -> Result<Self> {
        let base = dirs::cache_dir().context("Could not determine cache directory")?;
        Self::new(base.join("salat"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        use std::io::Write;

        // Write beside the target and rename so readers never see a partial file
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .context("Failed to create temporary cache file")?;
        tmp.write_all(value.as_bytes())?;
        tmp.flush()?;
        tmp.persist(self.path_for(key))
            .map_err(|e| e.error)
            .context("Failed to persist cache file")?;
        Ok(())
    }
}

/// In-process store, used when no cache directory is available and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Persisted shape of one event.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEvent {
    id: String,
    name: String,
    time: String,
    /// Informational only; the instant is rebuilt from the key's day and `time`.
    #[serde(default)]
    iso_time: Option<String>,
}

impl From<&PrayerEvent> for StoredEvent {
    fn from(event: &PrayerEvent) -> Self {
        Self {
            id: event.id().to_string(),
            name: event.label().to_string(),
            time: event.time.clone(),
            iso_time: Some(event.instant.to_rfc3339()),
        }
    }
}

/// Prayer-day cache over any [`KeyValueStore`].
#[derive(Clone)]
pub struct PrayerCache {
    store: Arc<dyn KeyValueStore>,
    precision: usize,
}

impl PrayerCache {
    pub fn new(store: Arc<dyn KeyValueStore>, precision: usize) -> Self {
        Self { store, precision }
    }

    /// Deterministic key, e.g. `prayers_2026-02-18_30.04_31.24_m5`.
    pub fn key(&self, day: NaiveDate, coordinate: Coordinate, method: CalculationMethod) -> String {
        format!(
            "{CACHE_KEY_PREFIX}_{}_{}_{}_m{}",
            day.format("%Y-%m-%d"),
            round_for_key(coordinate.latitude, self.precision),
            round_for_key(coordinate.longitude, self.precision),
            method.id()
        )
    }

    /// Look up a day. Absence and unreadable entries both return `None`.
    pub fn get(
        &self,
        day: NaiveDate,
        coordinate: Coordinate,
        method: CalculationMethod,
    ) -> Option<Vec<PrayerEvent>> {
        let key = self.key(day, coordinate, method);

        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log_warning!("Cache read failed for {key}: {e:#}");
                return None;
            }
        };

        match decode(&raw, day) {
            Ok(events) => Some(events),
            Err(e) => {
                log_warning!("Discarding unreadable cache entry {key}: {e:#}");
                None
            }
        }
    }

    /// Store a full canonical day.
    pub fn put(
        &self,
        day: NaiveDate,
        coordinate: Coordinate,
        method: CalculationMethod,
        events: &[PrayerEvent],
    ) -> Result<()> {
        anyhow::ensure!(
            is_canonical_day(events),
            "Refusing to cache a day that is not the five canonical prayers"
        );

        let key = self.key(day, coordinate, method);
        let stored: Vec<StoredEvent> = events.iter().map(StoredEvent::from).collect();
        let json = serde_json::to_string(&stored).context("Failed to serialize prayer day")?;
        self.store.set(&key, &json)
    }
}

/// Round to `precision` decimals for key construction, normalizing `-0`.
fn round_for_key(value: f64, precision: usize) -> String {
    let formatted = format!("{value:.precision$}");
    if formatted.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        formatted.trim_start_matches('-').to_string()
    } else {
        formatted
    }
}

fn decode(raw: &str, day: NaiveDate) -> Result<Vec<PrayerEvent>> {
    let stored: Vec<StoredEvent> = serde_json::from_str(raw).context("Malformed JSON")?;

    let events = stored
        .into_iter()
        .map(|s| {
            let name = PrayerName::from_id(&s.id)
                .with_context(|| format!("Unknown prayer id '{}'", s.id))?;
            let time = parse_clock(&s.time)?;
            Ok(PrayerEvent::new(name, time, day))
        })
        .collect::<Result<Vec<_>>>()?;

    anyhow::ensure!(is_canonical_day(&events), "Entry is not a canonical prayer day");
    Ok(events)
}
