//! Location tracking state machine and the publish cycle.
//!
//! [`Tracker`] is the synchronous core: it consumes [`TrackerEvent`]s one at a
//! time, decides whether a coordinate is worth resolving, and runs the publish
//! cycle (resolve → select next prayer → replace the shared snapshot → feed the
//! widget). [`TrackingController`] wraps it in a worker thread fed by a single
//! channel so that cycles never overlap, and owns the location subscription.
//!
//! ```text
//!   Idle ──permission──▶ Acquiring ──fix──▶ Tracking ◀─┐
//!                           │                  │        │ moved ≥ threshold
//!                       fix failed             └────────┘
//!                           ▼
//!                         Error ──fix──▶ Tracking
//!
//!   stop: any ──▶ Idle
//! ```

mod controller;

pub use controller::TrackingController;

use std::sync::Arc;

use crate::common::constants::{
    FETCH_ERROR_MESSAGE, LOCATION_ERROR_MESSAGE, PERMISSION_ERROR_MESSAGE,
};
use crate::geo::Coordinate;
use crate::location::PermissionStatus;
use crate::prayer::PrayerTimeService;
use crate::prayer::service::ResolutionSource;
use crate::state::{AppSnapshot, CancelHandle, Epoch, NextPrayerFact, StateReader, StateWriter};
use crate::widget::{self, WidgetPayload, WidgetSink};

/// Location tracking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingState {
    #[default]
    Idle,
    Acquiring,
    Tracking,
    Error,
}

impl TrackingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingState::Idle => "idle",
            TrackingState::Acquiring => "acquiring",
            TrackingState::Tracking => "tracking",
            TrackingState::Error => "error",
        }
    }
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    PermissionResolved(PermissionStatus),
    Fix(Coordinate),
    FixFailed(String),
    /// Re-run the cycle for the last published coordinate, skipping the debounce.
    Refresh,
    Stop,
}

/// What handling one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerOutcome {
    /// State changed without a publish cycle.
    Transitioned(TrackingState),
    Published(ResolutionSource),
    /// Too close to the last published coordinate.
    Debounced,
    /// Resolution failed; prior data kept.
    Failed,
    /// The shared state was cancelled underneath the cycle.
    Cancelled,
    /// Not applicable in the current state.
    Ignored,
    Stopped,
}

/// The single writer of the shared snapshot.
pub struct Tracker {
    service: PrayerTimeService,
    writer: StateWriter,
    epoch: Epoch,
    sink: Box<dyn WidgetSink>,
    movement_threshold: f64,
    state: TrackingState,
    last_published: Option<Coordinate>,
    stopped: bool,
    debug_enabled: bool,
}

impl Tracker {
    /// Writes are bound to the writer's current epoch; cancelling it silences
    /// this tracker for good.
    pub fn new(
        service: PrayerTimeService,
        writer: StateWriter,
        sink: Box<dyn WidgetSink>,
        movement_threshold: f64,
    ) -> Self {
        let epoch = writer.epoch();
        Self {
            service,
            writer,
            epoch,
            sink,
            movement_threshold,
            state: TrackingState::Idle,
            last_published: None,
            stopped: false,
            debug_enabled: false,
        }
    }

    pub fn with_debug(mut self, debug_enabled: bool) -> Self {
        self.debug_enabled = debug_enabled;
        self
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn last_published(&self) -> Option<Coordinate> {
        self.last_published
    }

    pub fn reader(&self) -> StateReader {
        self.writer.reader()
    }

    /// Handle that silences this tracker's writes.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.writer.cancel_handle()
    }

    /// Give the writer back, e.g. to record the final idle state after a stop.
    pub fn into_writer(self) -> StateWriter {
        self.writer
    }

    pub fn handle(&mut self, event: TrackerEvent) -> TrackerOutcome {
        if self.stopped {
            return TrackerOutcome::Ignored;
        }

        match event {
            TrackerEvent::PermissionResolved(status) => self.on_permission(status),
            TrackerEvent::Fix(coordinate) => self.on_fix(coordinate),
            TrackerEvent::FixFailed(reason) => self.on_fix_failed(&reason),
            TrackerEvent::Refresh => self.on_refresh(),
            TrackerEvent::Stop => self.on_stop(),
        }
    }

    fn on_permission(&mut self, status: PermissionStatus) -> TrackerOutcome {
        if self.state != TrackingState::Idle {
            return TrackerOutcome::Ignored;
        }

        if !status.foreground {
            log_warning!("Location permission denied");
            self.commit(|s| AppSnapshot {
                error: Some(PERMISSION_ERROR_MESSAGE.to_string()),
                ..s.clone()
            });
            return TrackerOutcome::Transitioned(self.state);
        }

        if !status.background && self.debug_enabled {
            log_debug!("Background location not granted; tracking in foreground only");
        }

        self.transition(TrackingState::Acquiring);
        self.commit(|s| AppSnapshot {
            error: None,
            ..s.clone()
        });
        TrackerOutcome::Transitioned(self.state)
    }

    fn on_fix(&mut self, coordinate: Coordinate) -> TrackerOutcome {
        match self.state {
            TrackingState::Idle => TrackerOutcome::Ignored,
            TrackingState::Acquiring | TrackingState::Error => {
                self.transition(TrackingState::Tracking);
                self.publish(coordinate)
            }
            TrackingState::Tracking => {
                if let Some(last) = self.last_published
                    && coordinate.within(&last, self.movement_threshold)
                {
                    if self.debug_enabled {
                        log_debug!("Ignoring fix {coordinate}: within {}° of {last}", self.movement_threshold);
                    }
                    return TrackerOutcome::Debounced;
                }
                self.publish(coordinate)
            }
        }
    }

    fn on_fix_failed(&mut self, reason: &str) -> TrackerOutcome {
        log_warning!("Location fix failed: {reason}");
        match self.state {
            TrackingState::Idle => TrackerOutcome::Ignored,
            TrackingState::Acquiring => {
                self.transition(TrackingState::Error);
                self.commit(|s| AppSnapshot {
                    error: Some(LOCATION_ERROR_MESSAGE.to_string()),
                    ..s.clone()
                });
                TrackerOutcome::Transitioned(self.state)
            }
            TrackingState::Tracking | TrackingState::Error => {
                self.commit(|s| AppSnapshot {
                    error: Some(LOCATION_ERROR_MESSAGE.to_string()),
                    ..s.clone()
                });
                TrackerOutcome::Transitioned(self.state)
            }
        }
    }

    fn on_refresh(&mut self) -> TrackerOutcome {
        match (self.state, self.last_published) {
            (TrackingState::Tracking, Some(coordinate)) => {
                log_block_start!("Refreshing prayer times for a new day");
                self.publish(coordinate)
            }
            _ => TrackerOutcome::Ignored,
        }
    }

    fn on_stop(&mut self) -> TrackerOutcome {
        self.transition(TrackingState::Idle);
        self.commit(|s| AppSnapshot {
            loading: false,
            ..s.clone()
        });
        self.stopped = true;
        TrackerOutcome::Stopped
    }

    fn transition(&mut self, next: TrackingState) {
        if self.state != next && self.debug_enabled {
            log_debug!("Tracking: {} → {}", self.state, next);
        }
        self.state = next;
    }

    /// Replace the snapshot with `f(current)`, always stamping the tracking state.
    fn commit<F>(&self, f: F) -> bool
    where
        F: FnOnce(&AppSnapshot) -> AppSnapshot,
    {
        let state = self.state;
        self.writer.update(self.epoch, |s| AppSnapshot {
            tracking: state,
            ..f(s)
        })
    }

    /// One resolve-and-publish cycle for an accepted coordinate.
    fn publish(&mut self, coordinate: Coordinate) -> TrackerOutcome {
        log_block_start!("Resolving prayer times for {coordinate}");

        if !self.commit(|s| AppSnapshot {
            loading: true,
            ..s.clone()
        }) {
            return TrackerOutcome::Cancelled;
        }

        let resolution = match self.service.resolve(coordinate) {
            Ok(resolution) => resolution,
            Err(e) => {
                log_error!("Failed to resolve prayer times: {e}");
                self.commit(|s| AppSnapshot {
                    error: Some(FETCH_ERROR_MESSAGE.to_string()),
                    loading: false,
                    ..s.clone()
                });
                return TrackerOutcome::Failed;
            }
        };

        let now = self.service.clock().now();
        let next = NextPrayerFact::select(&resolution.events, now).map(Arc::new);

        let committed = self.commit(|s| AppSnapshot {
            coordinate: Some(coordinate),
            events: resolution.events.clone(),
            next_prayer: next.clone(),
            method: Some(resolution.method),
            country: resolution.country.clone(),
            fetched_on: Some(resolution.day),
            loading: false,
            error: None,
            ..s.clone()
        });
        if !committed {
            return TrackerOutcome::Cancelled;
        }

        self.last_published = Some(coordinate);

        if let Some(next) = &next {
            log_decorated!("Next prayer: {} at {}", next.event.label(), next.event.time);
            let payload = WidgetPayload::new(&resolution.events, next, now);
            widget::publish(self.sink.as_ref(), &payload);
        }

        TrackerOutcome::Published(resolution.source)
    }
}
