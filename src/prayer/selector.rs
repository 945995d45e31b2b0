//! Next-prayer selection.

use chrono::{DateTime, Local};

use super::PrayerEvent;

/// The first event strictly after `now`, in canonical order.
///
/// When every event has passed, the first event is returned; it stands for
/// tomorrow's occurrence and callers computing a countdown must add a day.
/// Returns `None` only for an empty slice.
pub fn select_next<'a>(events: &'a [PrayerEvent], now: DateTime<Local>) -> Option<&'a PrayerEvent> {
    events
        .iter()
        .find(|event| event.instant > now)
        .or_else(|| events.first())
}

/// Whether `event` has already passed at `now`, i.e. the selection wrapped.
pub fn is_wrapped(event: &PrayerEvent, now: DateTime<Local>) -> bool {
    event.instant <= now
}
