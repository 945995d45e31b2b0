//! Countdown to the next prayer.
//!
//! Pure arithmetic plus a ticker thread. The ticker never touches the network
//! or storage; it re-reads the shared snapshot when it changes and otherwise
//! recomputes once per tick.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::common::constants::COUNTDOWN_PLACEHOLDER;
use crate::state::{AppSnapshot, NextPrayerFact, StateReader};
use crate::time_source::TimeSource;

/// Upper bound on how long a stop request can go unnoticed.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The instant to count towards: `instant`, or the same time tomorrow once it has passed.
pub fn countdown_target(instant: DateTime<Local>, now: DateTime<Local>) -> DateTime<Local> {
    if instant <= now {
        instant + ChronoDuration::days(1)
    } else {
        instant
    }
}

/// Whole seconds until the target, never negative.
pub fn remaining_seconds(instant: DateTime<Local>, now: DateTime<Local>) -> i64 {
    let millis = (countdown_target(instant, now) - now).num_milliseconds();
    millis.div_euclid(1000).max(0)
}

/// Zero-padded `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_hms(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// The countdown string for an optional fact.
pub fn countdown_string(fact: Option<&NextPrayerFact>, now: DateTime<Local>) -> String {
    match fact {
        Some(fact) => format_hms(remaining_seconds(fact.event.instant, now)),
        None => COUNTDOWN_PLACEHOLDER.to_string(),
    }
}

/// One rendered tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CountdownTick {
    pub fact: Option<Arc<NextPrayerFact>>,
    pub remaining: i64,
    pub text: String,
}

impl CountdownTick {
    pub fn compute(fact: Option<Arc<NextPrayerFact>>, now: DateTime<Local>) -> Self {
        let remaining = fact
            .as_ref()
            .map(|f| remaining_seconds(f.event.instant, now))
            .unwrap_or(0);
        let text = countdown_string(fact.as_deref(), now);
        Self {
            fact,
            remaining,
            text,
        }
    }
}

/// Follows the published fact, re-selecting locally when `now` crosses it.
struct FactTracker {
    snapshot: Arc<AppSnapshot>,
    fact: Option<Arc<NextPrayerFact>>,
}

impl FactTracker {
    fn new(snapshot: Arc<AppSnapshot>) -> Self {
        let fact = snapshot.next_prayer.clone();
        Self { snapshot, fact }
    }

    /// Returns true when the fact reference changed.
    fn replace_snapshot(&mut self, snapshot: Arc<AppSnapshot>) -> bool {
        let changed = !same_fact(&self.fact, &snapshot.next_prayer);
        if changed {
            self.fact = snapshot.next_prayer.clone();
        }
        self.snapshot = snapshot;
        changed
    }

    /// Roll over once a fact that was still ahead has been reached.
    fn roll_over(&mut self, now: DateTime<Local>) {
        let crossed = self
            .fact
            .as_ref()
            .is_some_and(|f| f.as_of < f.event.instant && f.event.instant <= now);
        if crossed {
            self.fact = NextPrayerFact::select(&self.snapshot.events, now).map(Arc::new);
        }
    }
}

fn same_fact(a: &Option<Arc<NextPrayerFact>>, b: &Option<Arc<NextPrayerFact>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Background thread emitting one [`CountdownTick`] per interval.
pub struct CountdownTicker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CountdownTicker {
    /// Emit a tick immediately, then every `interval`, and immediately again
    /// whenever the published fact changes.
    pub fn start<F>(
        reader: StateReader,
        clock: Arc<dyn TimeSource>,
        interval: Duration,
        mut on_tick: F,
    ) -> Result<Self>
    where
        F: FnMut(&CountdownTick) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("countdown".to_string())
            .spawn(move || {
                let updates = reader.subscribe();
                let mut tracker = FactTracker::new(reader.snapshot());
                let mut next_tick = Instant::now();

                while !thread_stop.load(Ordering::SeqCst) {
                    let wait = next_tick
                        .saturating_duration_since(Instant::now())
                        .min(STOP_POLL_INTERVAL);
                    match updates.recv_timeout(wait) {
                        Ok(snapshot) => {
                            if !tracker.replace_snapshot(snapshot) {
                                continue;
                            }
                            // Restart the cadence from the new fact.
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if Instant::now() < next_tick {
                                continue;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }

                    if thread_stop.load(Ordering::SeqCst) {
                        break;
                    }

                    let now = clock.now();
                    tracker.roll_over(now);
                    on_tick(&CountdownTick::compute(tracker.fact.clone(), now));
                    next_tick = Instant::now() + interval;
                }
            })
            .context("Failed to spawn countdown thread")?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop ticking. Returns after the thread has exited.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prayer::{PrayerEvent, PrayerName, anchor};
    use crate::state;
    use crate::time_source::{ManualTimeSource, parse_datetime};
    use chrono::{NaiveDate, NaiveTime};
    use std::sync::mpsc;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 18).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        anchor(day(), NaiveTime::from_hms_opt(h, m, s).unwrap())
    }

    fn events() -> Vec<PrayerEvent> {
        [(5, 12), (12, 15), (15, 20), (17, 54), (19, 12)]
            .into_iter()
            .zip(PrayerName::ALL)
            .map(|((h, m), n)| PrayerEvent::new(n, NaiveTime::from_hms_opt(h, m, 0).unwrap(), day()))
            .collect()
    }

    #[test]
    fn test_remaining_seconds() {
        assert_eq!(remaining_seconds(at(17, 54, 0), at(16, 0, 0)), 6840);
        // Sub-second remainders floor
        let now = at(17, 53, 59) + ChronoDuration::milliseconds(500);
        assert_eq!(remaining_seconds(at(17, 54, 0), now), 0);
        // At or past the target counts to tomorrow
        assert_eq!(remaining_seconds(at(5, 12, 0), at(5, 12, 0)), 86_400);
        assert_eq!(remaining_seconds(at(5, 12, 0), at(23, 0, 0)), 22_320);
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(6840), "01:54:00");
        assert_eq!(format_hms(22_320), "06:12:00");
        assert_eq!(format_hms(86_399), "23:59:59");
        assert_eq!(format_hms(-5), "00:00:00");
    }

    #[test]
    fn test_placeholder_without_fact() {
        assert_eq!(countdown_string(None, at(12, 0, 0)), "--:--:--");
        let tick = CountdownTick::compute(None, at(12, 0, 0));
        assert_eq!(tick.remaining, 0);
        assert_eq!(tick.text, COUNTDOWN_PLACEHOLDER);
    }

    #[test]
    fn test_fact_tracker_rolls_over_once() {
        let events = events();
        let now = at(17, 0, 0);
        let snapshot = AppSnapshot {
            next_prayer: NextPrayerFact::select(&events, now).map(Arc::new),
            events,
            ..AppSnapshot::default()
        };
        let mut tracker = FactTracker::new(Arc::new(snapshot));

        tracker.roll_over(at(17, 54, 0));
        assert_eq!(tracker.fact.as_ref().unwrap().event.name, PrayerName::Isha);

        tracker.roll_over(at(19, 12, 0));
        let wrapped = tracker.fact.clone().unwrap();
        assert_eq!(wrapped.event.name, PrayerName::Fajr);

        // A wrapped fact stays put; the countdown adds the day.
        tracker.roll_over(at(23, 0, 0));
        assert!(Arc::ptr_eq(tracker.fact.as_ref().unwrap(), &wrapped));
    }

    #[test]
    fn test_ticker_restarts_on_new_fact() {
        let clock = Arc::new(ManualTimeSource::new(parse_datetime("2026-02-18 16:00:00").unwrap()));
        let (writer, reader) = state::channel(AppSnapshot::default());
        let (tx, rx) = mpsc::channel();

        let ticker = CountdownTicker::start(reader, clock.clone(), Duration::from_secs(60), move |t| {
            let _ = tx.send(t.text.clone());
        })
        .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "--:--:--");

        let events = events();
        let fact = NextPrayerFact::select(&events, clock.now()).map(Arc::new);
        writer.update(writer.epoch(), |s| AppSnapshot {
            events: events.clone(),
            next_prayer: fact.clone(),
            ..s.clone()
        });

        // Arrives well before the 60s cadence would.
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "01:54:00");
        ticker.stop();
    }
}
