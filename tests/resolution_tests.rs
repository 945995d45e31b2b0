//! End-to-end resolution against a mock timings endpoint.

mod common;

use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;

use common::{CountingTimings, afternoon_clock, service};
use salat::geo::{Coordinate, StaticGeocoder};
use salat::prayer::aladhan::AladhanClient;
use salat::prayer::cache::{FileStore, MemoryStore};
use salat::prayer::service::ResolutionSource;
use salat::time_source::TimeSource;
use salat::prayer::{CalculationMethod, PrayerCache, PrayerName, PrayerTimeService, select_next};

const CAIRO_BODY: &str = r#"{
    "code": 200,
    "status": "OK",
    "data": {
        "timings": {
            "Isha": "19:12 (EET)",
            "Maghrib": "17:54 (EET)",
            "Sunset": "17:54 (EET)",
            "Asr": "15:20 (EET)",
            "Dhuhr": "12:15 (EET)",
            "Sunrise": "06:34 (EET)",
            "Fajr": "05:12 (EET)",
            "Imsak": "05:02 (EET)"
        }
    }
}"#;

fn cairo() -> Coordinate {
    Coordinate::new(30.0444, 31.2357)
}

#[test]
fn test_mapped_country_fetches_once_then_serves_from_cache() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", Matcher::Regex(r"^/v1/timings/\d+$".to_string()))
        .match_query(Matcher::UrlEncoded("method".into(), "5".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(CAIRO_BODY)
        .expect(1)
        .create();

    let clock = afternoon_clock();
    let store = Arc::new(MemoryStore::new());
    let service = PrayerTimeService::new(
        Arc::new(StaticGeocoder::new(Some("EG".to_string()))),
        Arc::new(AladhanClient::new(&server.url(), Duration::from_secs(5)).unwrap()),
        PrayerCache::new(store.clone(), 2),
        clock.clone(),
    );

    let first = service.resolve(cairo()).unwrap();
    assert_eq!(first.source, ResolutionSource::Remote);
    assert_eq!(first.method, CalculationMethod(5));
    assert_eq!(first.country.as_deref(), Some("EG"));
    assert_eq!(
        first.events.iter().map(|e| e.name).collect::<Vec<_>>(),
        PrayerName::ALL.to_vec()
    );
    assert_eq!(first.events[3].time, "17:54");
    assert_eq!(store.len(), 1);

    // Jitter that rounds to the same key is a cache hit.
    let second = service.resolve(Coordinate::new(30.0401, 31.2399)).unwrap();
    assert_eq!(second.source, ResolutionSource::Cache);
    assert_eq!(second.events, first.events);
    mock.assert();

    let next = select_next(&second.events, clock.now()).unwrap();
    assert_eq!(next.name, PrayerName::Maghrib);
}

#[test]
fn test_unmapped_and_unknown_countries_use_default_method() {
    for country in [Some("GB"), None] {
        let timings = Arc::new(CountingTimings::default());
        let resolution = service(country, timings.clone(), afternoon_clock())
            .resolve(Coordinate::new(51.5074, -0.1278))
            .unwrap();
        assert_eq!(resolution.method, CalculationMethod(3));
        assert_eq!(*timings.methods.lock().unwrap(), vec![CalculationMethod(3)]);
    }
}

#[test]
fn test_same_day_place_and_method_share_a_key() {
    let cache = PrayerCache::new(Arc::new(MemoryStore::new()), 2);
    let day = afternoon_clock().today();
    assert_eq!(
        cache.key(day, cairo(), CalculationMethod(5)),
        cache.key(day, Coordinate::new(30.0412, 31.2368), CalculationMethod(5))
    );
    assert_ne!(
        cache.key(day, cairo(), CalculationMethod(5)),
        cache.key(day, cairo(), CalculationMethod(3))
    );
}

#[test]
fn test_fetch_failure_is_reported_and_nothing_is_cached() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", Matcher::Any)
        .match_query(Matcher::Any)
        .with_status(503)
        .create();

    let store = Arc::new(MemoryStore::new());
    let service = PrayerTimeService::new(
        Arc::new(StaticGeocoder::new(Some("EG".to_string()))),
        Arc::new(AladhanClient::new(&server.url(), Duration::from_secs(5)).unwrap()),
        PrayerCache::new(store.clone(), 2),
        afternoon_clock(),
    );

    assert!(service.resolve(cairo()).is_err());
    assert!(store.is_empty());
}

#[test]
fn test_file_cache_survives_a_new_service() {
    let dir = tempfile::tempdir().unwrap();
    let timings = Arc::new(CountingTimings::default());
    let clock = afternoon_clock();

    let build = || {
        PrayerTimeService::new(
            Arc::new(StaticGeocoder::new(Some("EG".to_string()))),
            timings.clone(),
            PrayerCache::new(Arc::new(FileStore::new(dir.path()).unwrap()), 2),
            clock.clone(),
        )
    };

    let first = build().resolve(cairo()).unwrap();
    let second = build().resolve(cairo()).unwrap();

    assert_eq!(first.source, ResolutionSource::Remote);
    assert_eq!(second.source, ResolutionSource::Cache);
    assert_eq!(first.events, second.events);
    assert_eq!(timings.calls(), 1);
}
