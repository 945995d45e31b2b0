//! Home-screen widget bridge.
//!
//! The widget is an external process that reads one JSON payload from a
//! shared store and renders its own countdown. This module owns the payload
//! contract and the write side. Writes are best effort: a failed write is
//! logged and never affects application state.
//!
//! Sinks are chosen by capability: [`select_sink`] returns a
//! [`SharedStoreSink`] when the shared directory exists and a
//! [`NoopWidgetSink`] otherwise.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::common::constants::WIDGET_DATA_KEY;
use crate::prayer::PrayerEvent;
use crate::state::NextPrayerFact;

/// One row of the widget's prayer table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPrayerTime {
    pub name: String,
    pub time: String,
    pub iso_time: String,
}

/// The payload the widget decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPayload {
    pub next_prayer_name: String,
    /// Countdown target; a wrapped selection is already pushed to tomorrow.
    pub next_prayer_time: String,
    #[serde(default)]
    pub prayer_times: Vec<WidgetPrayerTime>,
    pub updated_at: String,
}

impl WidgetPayload {
    pub fn new(events: &[PrayerEvent], next: &NextPrayerFact, now: DateTime<Local>) -> Self {
        let mut target = next.event.instant;
        if target <= now {
            target = target + Duration::days(1);
        }

        Self {
            next_prayer_name: next.event.label().to_string(),
            next_prayer_time: target.to_rfc3339(),
            prayer_times: events
                .iter()
                .map(|e| WidgetPrayerTime {
                    name: e.label().to_string(),
                    time: e.time.clone(),
                    iso_time: e.instant.to_rfc3339(),
                })
                .collect(),
            updated_at: now.to_rfc3339(),
        }
    }

    /// Countdown target parsed back into local time.
    pub fn target(&self) -> Option<DateTime<Local>> {
        DateTime::parse_from_rfc3339(&self.next_prayer_time)
            .ok()
            .map(|t| t.with_timezone(&Local))
    }
}

/// Destination for widget payloads.
pub trait WidgetSink: Send + Sync {
    fn write(&self, payload: &WidgetPayload) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Used when no shared store exists in this environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWidgetSink;

impl WidgetSink for NoopWidgetSink {
    fn write(&self, _payload: &WidgetPayload) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Writes the payload as `<dir>/<key>.json`, replacing it atomically.
///
/// A sibling `<key>.lock` file is held exclusively while replacing so that a
/// reader holding a shared lock never races the rename.
#[derive(Debug, Clone)]
pub struct SharedStoreSink {
    dir: PathBuf,
    key: String,
}

impl SharedStoreSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            key: WIDGET_DATA_KEY.to_string(),
        }
    }

    pub fn payload_path(&self) -> PathBuf {
        payload_path(&self.dir, &self.key)
    }
}

impl WidgetSink for SharedStoreSink {
    fn write(&self, payload: &WidgetPayload) -> Result<()> {
        let json = serde_json::to_string(payload).context("Failed to serialize widget payload")?;

        let lock = open_lock(&self.dir, &self.key)?;
        FileExt::lock_exclusive(&lock).context("Failed to lock widget store")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .context("Failed to create temporary widget file")?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        let result = tmp
            .persist(self.payload_path())
            .map(|_| ())
            .map_err(|e| anyhow::Error::from(e.error))
            .context("Failed to replace widget payload");

        let _ = FileExt::unlock(&lock);
        result
    }

    fn name(&self) -> &'static str {
        "shared-store"
    }
}

/// Pick the sink for this environment.
pub fn select_sink(dir: Option<&Path>) -> Box<dyn WidgetSink> {
    match dir {
        Some(dir) if dir.is_dir() => Box::new(SharedStoreSink::new(dir)),
        _ => Box::new(NoopWidgetSink),
    }
}

/// Write `payload`, logging instead of failing.
pub fn publish(sink: &dyn WidgetSink, payload: &WidgetPayload) {
    if let Err(e) = sink.write(payload) {
        log_warning!("Widget bridge write failed: {e:#}");
    }
}

/// Read the payload the way the widget does. `Ok(None)` when nothing was written yet.
pub fn read_payload(dir: &Path) -> Result<Option<WidgetPayload>> {
    let path = payload_path(dir, WIDGET_DATA_KEY);
    if !path.exists() {
        return Ok(None);
    }

    let lock = open_lock(dir, WIDGET_DATA_KEY)?;
    FileExt::lock_shared(&lock).context("Failed to lock widget store")?;
    let content = std::fs::read_to_string(&path);
    let _ = FileExt::unlock(&lock);

    let content = content.with_context(|| format!("Failed to read {}", path.display()))?;
    let payload = serde_json::from_str(&content).context("Widget payload is not valid JSON")?;
    Ok(Some(payload))
}

fn payload_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn open_lock(dir: &Path, key: &str) -> Result<File> {
    let path = dir.join(format!("{key}.lock"));
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prayer::PrayerName;
    use crate::time_source::parse_datetime;
    use chrono::{NaiveDate, NaiveTime};

    fn events() -> Vec<PrayerEvent> {
        let day = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        [(5, 12), (12, 15), (15, 20), (17, 54), (19, 12)]
            .into_iter()
            .zip(PrayerName::ALL)
            .map(|((h, m), n)| PrayerEvent::new(n, NaiveTime::from_hms_opt(h, m, 0).unwrap(), day))
            .collect()
    }

    #[test]
    fn test_payload_shape() {
        let now = parse_datetime("2026-02-18 16:00:00").unwrap();
        let events = events();
        let fact = NextPrayerFact::select(&events, now).unwrap();
        let payload = WidgetPayload::new(&events, &fact, now);

        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["nextPrayerName"], "Maghrib");
        assert_eq!(json["prayerTimes"].as_array().unwrap().len(), 5);
        assert_eq!(json["prayerTimes"][0]["name"], "Fajr");
        assert_eq!(json["prayerTimes"][0]["time"], "05:12");
        assert!(json["prayerTimes"][0]["isoTime"].as_str().unwrap().starts_with("2026-02-18T05:12:00"));
        assert!(json["updatedAt"].as_str().unwrap().starts_with("2026-02-18T16:00:00"));
        assert_eq!(payload.target(), Some(fact.event.instant));
    }

    #[test]
    fn test_wrapped_target_is_pushed_to_tomorrow() {
        let now = parse_datetime("2026-02-18 23:00:00").unwrap();
        let events = events();
        let fact = NextPrayerFact::select(&events, now).unwrap();
        let payload = WidgetPayload::new(&events, &fact, now);

        assert_eq!(payload.next_prayer_name, "Fajr");
        assert_eq!(
            payload.target().unwrap(),
            parse_datetime("2026-02-19 05:12:00").unwrap()
        );
    }

    #[test]
    fn test_shared_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let now = parse_datetime("2026-02-18 16:00:00").unwrap();
        let events = events();
        let fact = NextPrayerFact::select(&events, now).unwrap();
        let payload = WidgetPayload::new(&events, &fact, now);

        assert_eq!(read_payload(dir.path()).unwrap(), None);

        let sink = select_sink(Some(dir.path()));
        assert_eq!(sink.name(), "shared-store");
        sink.write(&payload).unwrap();

        assert_eq!(read_payload(dir.path()).unwrap(), Some(payload));
    }

    #[test]
    fn test_missing_directory_selects_noop() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-there");
        let sink = select_sink(Some(&missing));
        assert_eq!(sink.name(), "none");
        assert_eq!(select_sink(None).name(), "none");
    }

    #[test]
    fn test_publish_swallows_write_errors() {
        let dir = tempfile::tempdir().unwrap();
        let sink = SharedStoreSink::new(dir.path().join("vanished"));
        let now = parse_datetime("2026-02-18 16:00:00").unwrap();
        let events = events();
        let fact = NextPrayerFact::select(&events, now).unwrap();

        assert!(sink.write(&WidgetPayload::new(&events, &fact, now)).is_err());
        publish(&sink, &WidgetPayload::new(&events, &fact, now));
    }
}
