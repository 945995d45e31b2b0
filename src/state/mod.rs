//! Shared application state.
//!
//! One [`AppSnapshot`] is the single source of truth for presentation layers.
//! It is replaced as a whole, never mutated field by field, so readers always
//! observe a consistent state. There is exactly one [`StateWriter`] (owned by
//! the publish cycle) and any number of [`StateReader`]s.
//!
//! Writes are guarded by an epoch. A writer captures the epoch when a publish
//! cycle begins and commits against it; [`CancelHandle::cancel`] bumps the
//! epoch under the same lock, so a cycle still running when tracking stops
//! cannot write afterwards.

use chrono::{DateTime, Local, NaiveDate};
use std::sync::mpsc::{Receiver, Sender, channel as mpsc_channel};
use std::sync::{Arc, Mutex, RwLock};

use crate::geo::Coordinate;
use crate::prayer::{CalculationMethod, PrayerEvent, select_next};
use crate::tracking::TrackingState;

/// The next-prayer fact derived from a day of events.
#[derive(Debug, Clone, PartialEq)]
pub struct NextPrayerFact {
    pub event: PrayerEvent,
    /// When the selection was made.
    pub as_of: DateTime<Local>,
}

impl NextPrayerFact {
    /// Select from `events` at `now`.
    pub fn select(events: &[PrayerEvent], now: DateTime<Local>) -> Option<Self> {
        select_next(events, now).map(|event| Self {
            event: event.clone(),
            as_of: now,
        })
    }
}

/// Everything presentation layers read.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSnapshot {
    /// Last coordinate a publish cycle succeeded for.
    pub coordinate: Option<Coordinate>,
    /// Canonical day of prayers, empty until the first successful cycle.
    pub events: Vec<PrayerEvent>,
    pub next_prayer: Option<Arc<NextPrayerFact>>,
    /// Diagnostic only.
    pub method: Option<CalculationMethod>,
    /// Diagnostic only.
    pub country: Option<String>,
    pub fetched_on: Option<NaiveDate>,
    pub loading: bool,
    /// Short user-facing message for the last failure, cleared on success.
    pub error: Option<String>,
    pub tracking: TrackingState,
    pub selected_sound: String,
}

impl AppSnapshot {
    pub fn new(selected_sound: impl Into<String>) -> Self {
        Self {
            coordinate: None,
            events: Vec::new(),
            next_prayer: None,
            method: None,
            country: None,
            fetched_on: None,
            loading: false,
            error: None,
            tracking: TrackingState::Idle,
            selected_sound: selected_sound.into(),
        }
    }

    /// Re-evaluate the next prayer at `now` without touching shared state.
    ///
    /// Keeps the published fact while it is still ahead of `now`; once `now`
    /// crosses it, selects again from the day's events.
    pub fn next_prayer_at(&self, now: DateTime<Local>) -> Option<Arc<NextPrayerFact>> {
        match &self.next_prayer {
            Some(fact) if fact.event.instant > now => Some(Arc::clone(fact)),
            _ => NextPrayerFact::select(&self.events, now).map(Arc::new),
        }
    }

    /// True when the events were produced for a day before `today`.
    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.fetched_on.is_some_and(|day| day < today)
    }
}

impl Default for AppSnapshot {
    fn default() -> Self {
        Self::new(crate::common::constants::DEFAULT_SOUND_ID)
    }
}

/// Opaque token identifying the lifetime a write belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

struct Slot {
    epoch: u64,
    snapshot: Arc<AppSnapshot>,
}

struct Shared {
    slot: RwLock<Slot>,
    subscribers: Mutex<Vec<Sender<Arc<AppSnapshot>>>>,
}

impl Shared {
    fn broadcast(&self, snapshot: &Arc<AppSnapshot>) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| tx.send(Arc::clone(snapshot)).is_ok());
    }
}

/// Create the state container with its single writer and a first reader.
pub fn channel(initial: AppSnapshot) -> (StateWriter, StateReader) {
    let shared = Arc::new(Shared {
        slot: RwLock::new(Slot {
            epoch: 0,
            snapshot: Arc::new(initial),
        }),
        subscribers: Mutex::new(Vec::new()),
    });

    (
        StateWriter {
            shared: Arc::clone(&shared),
        },
        StateReader { shared },
    )
}

/// The only handle that can replace the snapshot. Deliberately not `Clone`.
pub struct StateWriter {
    shared: Arc<Shared>,
}

impl StateWriter {
    /// Current epoch; capture at the start of a publish cycle.
    pub fn epoch(&self) -> Epoch {
        Epoch(self.shared.slot.read().unwrap_or_else(|e| e.into_inner()).epoch)
    }

    /// Replace the snapshot with `f(current)` if `epoch` is still current.
    ///
    /// Returns whether the write happened.
    pub fn update<F>(&self, epoch: Epoch, f: F) -> bool
    where
        F: FnOnce(&AppSnapshot) -> AppSnapshot,
    {
        let next = {
            let mut slot = self.shared.slot.write().unwrap_or_else(|e| e.into_inner());
            if slot.epoch != epoch.0 {
                return false;
            }
            let next = Arc::new(f(&slot.snapshot));
            if *next == *slot.snapshot {
                return true;
            }
            slot.snapshot = Arc::clone(&next);
            next
        };

        self.shared.broadcast(&next);
        true
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn reader(&self) -> StateReader {
        StateReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Invalidates every in-flight write. Held by whoever may stop tracking.
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let mut slot = self.shared.slot.write().unwrap_or_else(|e| e.into_inner());
        slot.epoch += 1;
    }
}

/// Read-only access to the shared snapshot.
#[derive(Clone)]
pub struct StateReader {
    shared: Arc<Shared>,
}

impl StateReader {
    pub fn snapshot(&self) -> Arc<AppSnapshot> {
        Arc::clone(&self.shared.slot.read().unwrap_or_else(|e| e.into_inner()).snapshot)
    }

    /// Receive every snapshot committed from now on.
    pub fn subscribe(&self) -> Receiver<Arc<AppSnapshot>> {
        let (tx, rx) = mpsc_channel();
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }
}
