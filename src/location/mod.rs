//! Location sources feeding the tracker.
//!
//! A [`LocationProvider`] answers three questions: may we use location at all,
//! where are we now, and tell me when we move. Notifications keep arriving
//! until the returned [`Subscription`] is cancelled or dropped.
//!
//! - [`FixedLocation`]: a configured coordinate that never moves
//! - [`FileLocation`]: a small TOML file written by some other process (a GPS
//!   daemon, a phone companion, a script), watched for changes

pub mod file;

pub use file::FileLocation;

use anyhow::Result;

use crate::geo::Coordinate;

/// Outcome of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionStatus {
    pub foreground: bool,
    /// Optional; tracking works without it.
    pub background: bool,
}

impl PermissionStatus {
    pub const GRANTED: PermissionStatus = PermissionStatus {
        foreground: true,
        background: true,
    };
    pub const DENIED: PermissionStatus = PermissionStatus {
        foreground: false,
        background: false,
    };
}

/// Callback invoked for every coordinate notification.
pub type LocationCallback = Box<dyn Fn(Coordinate) + Send + 'static>;

/// Source of coordinate fixes and change notifications.
pub trait LocationProvider: Send + Sync {
    fn request_permissions(&self) -> PermissionStatus;

    /// A single immediate fix.
    fn current_fix(&self) -> Result<Coordinate>;

    /// Start delivering notifications to `on_update`.
    fn watch(&self, on_update: LocationCallback) -> Result<Subscription>;
}

/// Live notification stream. Cancelling (or dropping) stops delivery.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to release.
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// A coordinate that never changes.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    coordinate: Coordinate,
}

impl FixedLocation {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

impl LocationProvider for FixedLocation {
    fn request_permissions(&self) -> PermissionStatus {
        PermissionStatus::GRANTED
    }

    fn current_fix(&self) -> Result<Coordinate> {
        Ok(self.coordinate)
    }

    fn watch(&self, _on_update: LocationCallback) -> Result<Subscription> {
        Ok(Subscription::inert())
    }
}

#[cfg(any(test, feature = "testing-support"))]
pub use manual::ManualLocation;

#[cfg(any(test, feature = "testing-support"))]
mod manual {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Location source driven by test code.
    #[derive(Clone)]
    pub struct ManualLocation {
        permissions: PermissionStatus,
        fix: Arc<Mutex<Result<Coordinate, String>>>,
        callbacks: Arc<Mutex<Vec<(Arc<AtomicBool>, LocationCallback)>>>,
    }

    impl ManualLocation {
        pub fn new(permissions: PermissionStatus, fix: Result<Coordinate, String>) -> Self {
            Self {
                permissions,
                fix: Arc::new(Mutex::new(fix)),
                callbacks: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn set_fix(&self, fix: Result<Coordinate, String>) {
            *self.fix.lock().unwrap_or_else(|e| e.into_inner()) = fix;
        }

        /// Deliver a notification to every live subscriber.
        pub fn push(&self, coordinate: Coordinate) {
            let callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
            for (active, callback) in callbacks.iter() {
                if active.load(Ordering::SeqCst) {
                    callback(coordinate);
                }
            }
        }

        pub fn active_subscriptions(&self) -> usize {
            self.callbacks
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .filter(|(active, _)| active.load(Ordering::SeqCst))
                .count()
        }
    }

    impl LocationProvider for ManualLocation {
        fn request_permissions(&self) -> PermissionStatus {
            self.permissions
        }

        fn current_fix(&self) -> Result<Coordinate> {
            self.fix
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
                .map_err(anyhow::Error::msg)
        }

        fn watch(&self, on_update: LocationCallback) -> Result<Subscription> {
            let active = Arc::new(AtomicBool::new(true));
            self.callbacks
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((Arc::clone(&active), on_update));
            Ok(Subscription::new(move || active.store(false, Ordering::SeqCst)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fixed_location() {
        let provider = FixedLocation::new(Coordinate::new(21.4225, 39.8262));
        assert_eq!(provider.request_permissions(), PermissionStatus::GRANTED);
        assert_eq!(provider.current_fix().unwrap(), Coordinate::new(21.4225, 39.8262));
        assert!(provider.watch(Box::new(|_| {})).is_ok());
    }

    #[test]
    fn test_subscription_cancels_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        subscription.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = Arc::clone(&calls);
        drop(Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_manual_location_fix_can_change() {
        let provider = ManualLocation::new(PermissionStatus::GRANTED, Err("no signal".to_string()));
        assert_eq!(provider.current_fix().unwrap_err().to_string(), "no signal");

        provider.set_fix(Ok(Coordinate::new(21.4225, 39.8262)));
        assert_eq!(provider.current_fix().unwrap(), Coordinate::new(21.4225, 39.8262));
    }

    #[test]
    fn test_manual_location_stops_after_cancel() {
        let provider = ManualLocation::new(PermissionStatus::GRANTED, Ok(Coordinate::new(0.0, 0.0)));
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let subscription = provider
            .watch(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        provider.push(Coordinate::new(1.0, 1.0));
        subscription.cancel();
        provider.push(Coordinate::new(2.0, 2.0));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(provider.active_subscriptions(), 0);
    }
}
