//! Prayer time resolution for a coordinate.
//!
//! Pipeline: reverse geocode → method → cache lookup → remote fetch on miss.
//! Geocoding failures degrade to "unknown country" and never stop resolution;
//! fetch failures are returned to the caller as a [`FetchError`].

use chrono::{DateTime, Local, NaiveDate};
use std::sync::Arc;

use super::aladhan::{FetchError, RawTimings, TimingsProvider};
use super::{CalculationMethod, PrayerCache, PrayerEvent, PrayerName, resolve_method};
use crate::geo::{Coordinate, Geocoder};
use crate::time_source::TimeSource;

/// Where a resolved day came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Cache,
    Remote,
}

/// A resolved day of prayers.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Canonical order, anchored to `day`.
    pub events: Vec<PrayerEvent>,
    pub method: CalculationMethod,
    pub country: Option<String>,
    pub day: NaiveDate,
    pub source: ResolutionSource,
}

/// Orchestrates country lookup, method choice, caching and remote computation.
pub struct PrayerTimeService {
    geocoder: Arc<dyn Geocoder>,
    timings: Arc<dyn TimingsProvider>,
    cache: PrayerCache,
    clock: Arc<dyn TimeSource>,
    method_override: Option<CalculationMethod>,
    debug_enabled: bool,
}

impl PrayerTimeService {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        timings: Arc<dyn TimingsProvider>,
        cache: PrayerCache,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            geocoder,
            timings,
            cache,
            clock,
            method_override: None,
            debug_enabled: false,
        }
    }

    /// Use a fixed method instead of resolving one from the country.
    pub fn with_method_override(mut self, method: Option<CalculationMethod>) -> Self {
        self.method_override = method;
        self
    }

    pub fn with_debug(mut self, debug_enabled: bool) -> Self {
        self.debug_enabled = debug_enabled;
        self
    }

    pub fn clock(&self) -> &Arc<dyn TimeSource> {
        &self.clock
    }

    /// Resolve today's prayers for `coordinate`.
    pub fn resolve(&self, coordinate: Coordinate) -> Result<Resolution, FetchError> {
        let now = self.clock.now();
        let day = now.date_naive();

        let country = self.country_for(coordinate);
        let method = self
            .method_override
            .unwrap_or_else(|| resolve_method(country.as_deref()));

        log_decorated!(
            "Country: {} → Method: {method} ({})",
            country.as_deref().unwrap_or("unknown"),
            method.describe()
        );

        if let Some(events) = self.cache.get(day, coordinate, method) {
            if self.debug_enabled {
                log_debug!("Cache hit for {}", self.cache.key(day, coordinate, method));
            }
            return Ok(Resolution {
                events,
                method,
                country,
                day,
                source: ResolutionSource::Cache,
            });
        }

        let events = self.fetch_day(coordinate, method, now)?;

        if let Err(e) = self.cache.put(day, coordinate, method, &events) {
            log_warning!("Could not cache prayer times: {e:#}");
        }

        Ok(Resolution {
            events,
            method,
            country,
            day,
            source: ResolutionSource::Remote,
        })
    }

    fn country_for(&self, coordinate: Coordinate) -> Option<String> {
        match self.geocoder.reverse_geocode(coordinate) {
            Ok(country) => country,
            Err(e) => {
                if self.debug_enabled {
                    log_debug!("Reverse geocoding failed, using default method: {e}");
                }
                None
            }
        }
    }

    fn fetch_day(
        &self,
        coordinate: Coordinate,
        method: CalculationMethod,
        now: DateTime<Local>,
    ) -> Result<Vec<PrayerEvent>, FetchError> {
        let raw = self.timings.fetch_timings(coordinate, method, now)?;
        normalize_timings(&raw, now.date_naive())
    }
}

/// Turn a raw timings map into the canonical day, whatever order the map is in.
pub fn normalize_timings(raw: &RawTimings, day: NaiveDate) -> Result<Vec<PrayerEvent>, FetchError> {
    PrayerName::ALL
        .into_iter()
        .map(|name| {
            let value = raw
                .get(name.label())
                .ok_or_else(|| FetchError::MissingPrayer(name.label().to_string()))?;
            PrayerEvent::from_raw(name, value, day).map_err(|_| FetchError::InvalidTime {
                prayer: name.label().to_string(),
                raw: value.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GeocodeError, MockGeocoder};
    use crate::prayer::aladhan::MockTimingsProvider;
    use crate::prayer::cache::{KeyValueStore, MemoryStore};
    use crate::time_source::{ManualTimeSource, parse_datetime};
    use mockall::predicate::*;

    fn raw_cairo() -> RawTimings {
        // Deliberately not in canonical order
        [
            ("Isha", "19:12 (EET)"),
            ("Sunrise", "06:34 (EET)"),
            ("Asr", "15:20 (EET)"),
            ("Fajr", "05:12 (EET)"),
            ("Maghrib", "17:54 (EET)"),
            ("Dhuhr", "12:15 (EET)"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn clock() -> Arc<ManualTimeSource> {
        Arc::new(ManualTimeSource::new(
            parse_datetime("2026-02-18 16:00:00").unwrap(),
        ))
    }

    fn service(
        geocoder: MockGeocoder,
        timings: MockTimingsProvider,
        store: Arc<MemoryStore>,
        clock: Arc<ManualTimeSource>,
    ) -> PrayerTimeService {
        PrayerTimeService::new(
            Arc::new(geocoder),
            Arc::new(timings),
            PrayerCache::new(store, 2),
            clock,
        )
    }

    #[test]
    fn test_normalize_timings_orders_and_strips() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        let events = normalize_timings(&raw_cairo(), day).unwrap();
        let names: Vec<_> = events.iter().map(|e| e.label()).collect();
        assert_eq!(names, ["Fajr", "Dhuhr", "Asr", "Maghrib", "Isha"]);
        let times: Vec<_> = events.iter().map(|e| e.time.as_str()).collect();
        assert_eq!(times, ["05:12", "12:15", "15:20", "17:54", "19:12"]);
    }

    #[test]
    fn test_normalize_timings_missing_or_bad_entry() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();

        let mut missing = raw_cairo();
        missing.remove("Asr");
        assert!(matches!(
            normalize_timings(&missing, day),
            Err(FetchError::MissingPrayer(p)) if p == "Asr"
        ));

        let mut bad = raw_cairo();
        bad.insert("Isha".to_string(), "later".to_string());
        assert!(matches!(
            normalize_timings(&bad, day),
            Err(FetchError::InvalidTime { prayer, .. }) if prayer == "Isha"
        ));
    }

    #[test]
    fn test_mapped_country_uses_its_method_and_caches() {
        let cairo = Coordinate::new(30.0444, 31.2357);

        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_reverse_geocode()
            .times(2)
            .returning(|_| Ok(Some("EG".to_string())));

        let mut timings = MockTimingsProvider::new();
        timings
            .expect_fetch_timings()
            .with(eq(cairo), eq(CalculationMethod(5)), always())
            .times(1)
            .returning(|_, _, _| Ok(raw_cairo()));

        let store = Arc::new(MemoryStore::new());
        let service = service(geocoder, timings, store.clone(), clock());

        let first = service.resolve(cairo).unwrap();
        assert_eq!(first.method, CalculationMethod(5));
        assert_eq!(first.country.as_deref(), Some("EG"));
        assert_eq!(first.source, ResolutionSource::Remote);
        assert_eq!(store.len(), 1);

        // Second call within the same day hits the cache; the mock allows one fetch only
        let second = service.resolve(cairo).unwrap();
        assert_eq!(second.source, ResolutionSource::Cache);
        assert_eq!(second.events, first.events);
    }

    #[test]
    fn test_geocoding_failure_falls_back_to_default_method() {
        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_reverse_geocode()
            .returning(|_| Err(GeocodeError::Transport("offline".to_string())));

        let mut timings = MockTimingsProvider::new();
        timings
            .expect_fetch_timings()
            .with(always(), eq(CalculationMethod(3)), always())
            .times(1)
            .returning(|_, _, _| Ok(raw_cairo()));

        let service = service(geocoder, timings, Arc::new(MemoryStore::new()), clock());
        let resolution = service.resolve(Coordinate::new(51.5074, -0.1278)).unwrap();
        assert_eq!(resolution.method, CalculationMethod::DEFAULT);
        assert_eq!(resolution.country, None);
    }

    #[test]
    fn test_fetch_failure_propagates_and_caches_nothing() {
        let mut geocoder = MockGeocoder::new();
        geocoder.expect_reverse_geocode().returning(|_| Ok(None));

        let mut timings = MockTimingsProvider::new();
        timings
            .expect_fetch_timings()
            .returning(|_, _, _| Err(FetchError::Status(502)));

        let store = Arc::new(MemoryStore::new());
        let service = service(geocoder, timings, store.clone(), clock());
        let err = service.resolve(Coordinate::new(10.0, 10.0)).unwrap_err();
        assert!(matches!(err, FetchError::Status(502)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_method_override_skips_resolver() {
        let mut geocoder = MockGeocoder::new();
        geocoder
            .expect_reverse_geocode()
            .returning(|_| Ok(Some("EG".to_string())));

        let mut timings = MockTimingsProvider::new();
        timings
            .expect_fetch_timings()
            .with(always(), eq(CalculationMethod(4)), always())
            .returning(|_, _, _| Ok(raw_cairo()));

        let service = service(geocoder, timings, Arc::new(MemoryStore::new()), clock())
            .with_method_override(Some(CalculationMethod(4)));
        let resolution = service.resolve(Coordinate::new(30.0, 31.0)).unwrap();
        assert_eq!(resolution.method, CalculationMethod(4));
        assert_eq!(resolution.country.as_deref(), Some("EG"));
    }

    #[test]
    fn test_new_day_refetches() {
        let here = Coordinate::new(30.0444, 31.2357);

        let mut geocoder = MockGeocoder::new();
        geocoder.expect_reverse_geocode().returning(|_| Ok(Some("EG".to_string())));

        let mut timings = MockTimingsProvider::new();
        timings
            .expect_fetch_timings()
            .times(2)
            .returning(|_, _, _| Ok(raw_cairo()));

        let clock = clock();
        let store = Arc::new(MemoryStore::new());
        let service = service(geocoder, timings, store.clone(), clock.clone());

        let today = service.resolve(here).unwrap();
        clock.advance(chrono::Duration::days(1));
        let tomorrow = service.resolve(here).unwrap();

        assert_eq!(tomorrow.source, ResolutionSource::Remote);
        assert_eq!(tomorrow.day, today.day.succ_opt().unwrap());
        assert!(tomorrow.events.iter().all(|e| e.day() == tomorrow.day));
        assert_eq!(store.len(), 2);
        assert!(store.get("prayers_2026-02-19_30.04_31.24_m5").unwrap().is_some());
    }
}
