//! Clock abstraction.
//!
//! Everything that needs "now" (the service when anchoring a day, the publish
//! cycle when selecting the next prayer, the countdown) takes an
//! `Arc<dyn TimeSource>`. The process-wide default is the real clock; `--at`
//! installs a [`ManualTimeSource`] instead so a whole session can be replayed at
//! a fixed wall time.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, TimeZone};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};

static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

/// Source of the current local time.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    /// Local calendar date of [`TimeSource::now`].
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Whether this clock is driven manually rather than by the system.
    fn is_manual(&self) -> bool {
        false
    }
}

/// System clock.
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
pub struct ManualTimeSource {
    current: Mutex<DateTime<Local>>,
}

impl ManualTimeSource {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn set(&self, time: DateTime<Local>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = time;
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *guard = *guard + by;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Local> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_manual(&self) -> bool {
        true
    }
}

/// Real time shifted to start at a chosen wall time. Used by `--at` for
/// long-running sessions so the countdown still moves.
pub struct OffsetTimeSource {
    offset: ChronoDuration,
}

impl OffsetTimeSource {
    pub fn starting_at(start: DateTime<Local>) -> Self {
        Self {
            offset: start - Local::now(),
        }
    }
}

impl TimeSource for OffsetTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now() + self.offset
    }

    fn is_manual(&self) -> bool {
        true
    }
}

/// Install the process-wide clock. Only the first call has an effect.
pub fn init_time_source(source: Arc<dyn TimeSource>) {
    TIME_SOURCE.set(source).ok();
}

pub fn is_initialized() -> bool {
    TIME_SOURCE.get().is_some()
}

/// The process-wide clock, defaulting to [`RealTimeSource`].
pub fn global() -> Arc<dyn TimeSource> {
    Arc::clone(TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource)))
}

pub fn now() -> DateTime<Local> {
    global().now()
}

pub fn is_manual() -> bool {
    global().is_manual()
}

/// Parse "YYYY-MM-DD HH:MM:SS" as a local wall time.
pub fn parse_datetime(s: &str) -> Result<DateTime<Local>, String> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM:SS"))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("{s} does not exist in the local timezone"))
}
