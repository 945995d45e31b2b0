//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use salat::geo::{Coordinate, StaticGeocoder};
use salat::prayer::aladhan::{FetchError, RawTimings, TimingsProvider};
use salat::prayer::cache::MemoryStore;
use salat::prayer::{CalculationMethod, PrayerCache, PrayerTimeService};
use salat::time_source::{ManualTimeSource, parse_datetime};
use salat::widget::{WidgetPayload, WidgetSink};

/// Fixed timings that count how often they were asked for.
#[derive(Default)]
pub struct CountingTimings {
    pub calls: AtomicUsize,
    pub failing: AtomicBool,
    pub methods: Mutex<Vec<CalculationMethod>>,
}

impl CountingTimings {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl TimingsProvider for CountingTimings {
    fn fetch_timings(
        &self,
        _coordinate: Coordinate,
        method: CalculationMethod,
        _at: DateTime<Local>,
    ) -> Result<RawTimings, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.methods.lock().unwrap().push(method);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Transport("connection refused".to_string()));
        }
        Ok([
            ("Fajr", "05:12 (EET)"),
            ("Sunrise", "06:34 (EET)"),
            ("Dhuhr", "12:15 (EET)"),
            ("Asr", "15:20 (EET)"),
            ("Maghrib", "17:54 (EET)"),
            ("Isha", "19:12 (EET)"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect())
    }
}

/// Widget sink that keeps every payload it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub payloads: Arc<Mutex<Vec<WidgetPayload>>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }
}

impl WidgetSink for RecordingSink {
    fn write(&self, payload: &WidgetPayload) -> anyhow::Result<()> {
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// 2026-02-18 16:00 local: Asr has passed, Maghrib is next.
pub fn afternoon_clock() -> Arc<ManualTimeSource> {
    Arc::new(ManualTimeSource::new(
        parse_datetime("2026-02-18 16:00:00").unwrap(),
    ))
}

pub fn service(
    country: Option<&str>,
    timings: Arc<CountingTimings>,
    clock: Arc<ManualTimeSource>,
) -> PrayerTimeService {
    PrayerTimeService::new(
        Arc::new(StaticGeocoder::new(country.map(str::to_string))),
        timings,
        PrayerCache::new(Arc::new(MemoryStore::new()), 2),
        clock,
    )
}
