//! Threaded driver for [`Tracker`].
//!
//! Every input (permission result, fixes, subscription notifications,
//! refreshes, stop) goes through one channel into one worker thread, so the
//! publish cycles it triggers run strictly one after another.

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};
use std::thread::JoinHandle;

use super::{Tracker, TrackerEvent, TrackingState};
use crate::location::{LocationProvider, Subscription};
use crate::state::{AppSnapshot, CancelHandle, StateReader, StateWriter};

/// Running location tracking session.
pub struct TrackingController {
    tx: Sender<TrackerEvent>,
    worker: Option<JoinHandle<StateWriter>>,
    subscription: Option<Subscription>,
    cancel: CancelHandle,
    stopped: Arc<AtomicBool>,
    reader: StateReader,
}

impl TrackingController {
    /// Request permission, take a first fix and subscribe to updates.
    ///
    /// A denied permission or failed first fix still returns a running
    /// controller; the outcome is visible in the shared snapshot.
    pub fn start(provider: Arc<dyn LocationProvider>, tracker: Tracker) -> Result<Self> {
        let (tx, rx) = channel::<TrackerEvent>();
        let stopped = Arc::new(AtomicBool::new(false));

        let cancel = tracker.cancel_handle();
        let reader = tracker.reader();

        let worker_stopped = Arc::clone(&stopped);
        let worker = std::thread::Builder::new()
            .name("tracking".to_string())
            .spawn(move || {
                let mut tracker = tracker;
                while let Ok(event) = rx.recv() {
                    let is_stop = event == TrackerEvent::Stop;
                    if worker_stopped.load(Ordering::SeqCst) && !is_stop {
                        continue;
                    }
                    tracker.handle(event);
                    if is_stop {
                        break;
                    }
                }
                tracker.into_writer()
            })?;

        let mut controller = Self {
            tx,
            worker: Some(worker),
            subscription: None,
            cancel,
            stopped,
            reader,
        };

        let permission = provider.request_permissions();
        controller.send(TrackerEvent::PermissionResolved(permission));
        if !permission.foreground {
            return Ok(controller);
        }

        match provider.current_fix() {
            Ok(coordinate) => controller.send(TrackerEvent::Fix(coordinate)),
            Err(e) => controller.send(TrackerEvent::FixFailed(format!("{e:#}"))),
        }

        let notify_tx = controller.tx.clone();
        let notify_stopped = Arc::clone(&controller.stopped);
        let subscription = provider.watch(Box::new(move |coordinate| {
            if !notify_stopped.load(Ordering::SeqCst) {
                let _ = notify_tx.send(TrackerEvent::Fix(coordinate));
            }
        }));

        match subscription {
            Ok(subscription) => controller.subscription = Some(subscription),
            Err(e) => log_warning!("Location updates unavailable: {e:#}"),
        }

        Ok(controller)
    }

    pub fn reader(&self) -> StateReader {
        self.reader.clone()
    }

    /// Re-resolve the last published coordinate, e.g. after midnight.
    pub fn refresh(&self) {
        self.send(TrackerEvent::Refresh);
    }

    /// Stop tracking.
    ///
    /// Any cycle still in flight becomes a no-op, the subscription is released
    /// and the snapshot is left idle. Returns the writer so a new session can
    /// be started on the same state.
    pub fn stop(mut self) -> Result<StateWriter> {
        self.shutdown()
            .ok_or_else(|| anyhow::anyhow!("Tracking worker exited unexpectedly"))
    }

    fn send(&self, event: TrackerEvent) {
        if !self.stopped.load(Ordering::SeqCst) {
            let _ = self.tx.send(event);
        }
    }

    fn shutdown(&mut self) -> Option<StateWriter> {
        let worker = self.worker.take()?;

        self.stopped.store(true, Ordering::SeqCst);
        self.cancel.cancel();
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        let _ = self.tx.send(TrackerEvent::Stop);

        let writer = match worker.join() {
            Ok(writer) => writer,
            Err(_) => {
                log_error!("Tracking worker panicked");
                return None;
            }
        };

        writer.update(writer.epoch(), |s| AppSnapshot {
            tracking: TrackingState::Idle,
            loading: false,
            ..s.clone()
        });
        Some(writer)
    }
}

impl Drop for TrackingController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
