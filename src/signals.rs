//! Signal handling.
//!
//! SIGINT, SIGTERM and SIGHUP request shutdown. SIGUSR2 asks a running instance
//! to re-resolve today's prayer times for its current location.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR2},
    iterator::Signals,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

/// Messages delivered to the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMessage {
    /// SIGINT, SIGTERM, SIGHUP
    Shutdown,
    /// SIGUSR2
    Refresh,
}

/// Signal handling state shared between threads.
pub struct SignalState {
    /// Cleared once a shutdown signal arrives
    pub running: Arc<AtomicBool>,
    pub signal_receiver: Receiver<SignalMessage>,
    /// Lets other threads inject messages into the same stream
    pub signal_sender: Sender<SignalMessage>,
}

/// Register handlers and start the signal thread.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let running = Arc::new(AtomicBool::new(true));
    let (signal_sender, signal_receiver) = std::sync::mpsc::channel::<SignalMessage>();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running_clone = Arc::clone(&running);
    let sender_clone = signal_sender.clone();

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                let message = match sig {
                    SIGUSR2 => SignalMessage::Refresh,
                    _ => {
                        running_clone.store(false, Ordering::SeqCst);
                        SignalMessage::Shutdown
                    }
                };

                if debug_enabled {
                    log_pipe!();
                    log_debug!("Received signal {sig} → {message:?}");
                }

                if sender_clone.send(message).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn signal thread")?;

    Ok(SignalState {
        running,
        signal_receiver,
        signal_sender,
    })
}
