//! Location read from a watched TOML file.
//!
//! The file holds two keys:
//!
//! ```toml
//! latitude = 30.0444
//! longitude = 31.2357
//! ```
//!
//! Whatever writes it (a GPS daemon hook, a phone companion, a shell script) only
//! has to replace the file; the parent directory is watched so that atomic
//! renames are seen as well as in-place writes.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

use super::{LocationCallback, LocationProvider, PermissionStatus, Subscription};
use crate::common::utils::private_path;
use crate::geo::Coordinate;

/// How often the watcher thread checks for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Deserialize)]
struct LocationFile {
    latitude: f64,
    longitude: f64,
}

/// Location provider backed by a file on disk.
#[derive(Debug, Clone)]
pub struct FileLocation {
    path: PathBuf,
    debug_enabled: bool,
}

impl FileLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debug_enabled: false,
        }
    }

    pub fn with_debug(mut self, debug_enabled: bool) -> Self {
        self.debug_enabled = debug_enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<Coordinate> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read location file {}", private_path(path)))?;
        let parsed: LocationFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse location file {}", private_path(path)))?;

        let coordinate = Coordinate::new(parsed.latitude, parsed.longitude);
        if !coordinate.is_valid() {
            anyhow::bail!("Location file holds an out-of-range coordinate: {coordinate}");
        }
        Ok(coordinate)
    }

    fn is_our_file(event_path: &Path, watched: &Path) -> bool {
        event_path == watched
            || (event_path.parent() == watched.parent()
                && event_path.file_name() == watched.file_name())
    }
}

impl LocationProvider for FileLocation {
    /// Readable file means permission. There is no separate background grant.
    fn request_permissions(&self) -> PermissionStatus {
        let readable = self.path.is_file();
        PermissionStatus {
            foreground: readable,
            background: readable,
        }
    }

    fn current_fix(&self) -> Result<Coordinate> {
        Self::read(&self.path)
    }

    fn watch(&self, on_update: LocationCallback) -> Result<Subscription> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let (tx, rx) = std::sync::mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res
                    && matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
                {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create location file watcher")?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", private_path(&parent)))?;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let watched = self.path.clone();
        let debug_enabled = self.debug_enabled;

        thread::Builder::new()
            .name("location-watcher".to_string())
            .spawn(move || {
                // The watcher lives exactly as long as this thread.
                let _watcher = watcher;
                let mut last_delivered: Option<Coordinate> = None;

                while !stop_flag.load(Ordering::SeqCst) {
                    let event = match rx.recv_timeout(POLL_INTERVAL) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    };

                    if !event.paths.iter().any(|p| Self::is_our_file(p, &watched)) {
                        continue;
                    }

                    match Self::read(&watched) {
                        Ok(coordinate) => {
                            if last_delivered == Some(coordinate) {
                                continue;
                            }
                            last_delivered = Some(coordinate);
                            if !stop_flag.load(Ordering::SeqCst) {
                                on_update(coordinate);
                            }
                        }
                        Err(e) if debug_enabled => {
                            // Writers often leave a half-written file for an instant.
                            log_debug!("Ignoring unreadable location update: {e:#}");
                        }
                        Err(_) => {}
                    }
                }
            })
            .context("Failed to spawn location watcher thread")?;

        Ok(Subscription::new(move || stop.store(true, Ordering::SeqCst)))
    }
}
