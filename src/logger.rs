//! Structured logging with box-drawing output.
//!
//! Every log line goes through [`write_output`], which prints to stdout or, once
//! [`Log::start_file_logging`] has been called, forwards the line to a background
//! writer thread with ANSI colour codes removed.
//!
//! ## Conventions
//!
//! - `log_version!` opens the output with the `┏ salat vX.Y.Z ━━╸` header.
//! - `log_block_start!` starts a new conceptual block (`┃` spacer then `┣ message`).
//! - `log_decorated!` continues the current block (`┣ message`).
//! - `log_indented!` prints nested detail (`┃   message`).
//! - `log_pipe!` inserts an empty `┃` spacer, typically before a levelled message.
//! - `log_end!` closes the output with `╹`.
//! - `log_info!`, `log_warning!`, `log_error!`, `log_debug!` carry a
//!   `[LEVEL]` tag and are used where the message has a semantic severity.
//!
//! When the process runs against a manual clock (`--at`), every line is prefixed
//! with the simulated wall time so that recorded sessions can be replayed.

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

static LOG_CHANNEL: OnceLock<Sender<LogMessage>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Logging facade. All state is process-wide.
pub struct Log;

impl Log {
    /// Enable or disable logging, e.g. for quiet one-shot commands.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Whether output currently goes to a file.
    pub fn is_file_logging() -> bool {
        LOG_CHANNEL.get().is_some()
    }

    /// Route all further output to `file_path`.
    ///
    /// Returns a guard that flushes and joins the writer thread when dropped.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(tx.clone())
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                let mut file = std::fs::File::create(&file_path)?;
                loop {
                    match rx.recv() {
                        Ok(LogMessage::Formatted(text)) => file.write_all(text.as_bytes())?,
                        Ok(LogMessage::Shutdown) | Err(_) => {
                            file.flush()?;
                            break;
                        }
                    }
                }
                Ok::<(), anyhow::Error>(())
            })?;

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Timestamp prefix shown while running on a manual clock, empty otherwise.
    pub fn timestamp_prefix() -> String {
        if crate::time_source::is_initialized() && crate::time_source::is_manual() {
            format!("[{}] ", crate::time_source::now().format("%H:%M:%S"))
        } else {
            String::new()
        }
    }
}

/// Keeps the file writer thread alive; flushes on drop.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Remove `ESC [ ... m` colour sequences.
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Write one already-formatted chunk. Public because the macros expand to it.
pub fn write_output(text: &str) {
    if let Some(tx) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

/// Shared expansion for every line-oriented macro below.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    ($template:literal, $($arg:tt)+) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::timestamp_prefix();
            let message = format!($($arg)+);
            $crate::logger::write_output(&format!($template, prefix = prefix, message = message));
        }
    }};
}

/// Continue the current block: `┣ message`.
#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)+) => { $crate::__log_line!("{prefix}┣ {message}\n", $($arg)+) };
}

/// Nested detail: `┃   message`.
#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)+) => { $crate::__log_line!("{prefix}┃   {message}\n", $($arg)+) };
}

/// Start a new block: spacer then `┣ message`.
#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)+) => { $crate::__log_line!("{prefix}┃\n{prefix}┣ {message}\n", $($arg)+) };
}

/// Empty `┃` spacer line.
#[macro_export]
macro_rules! log_pipe {
    () => { $crate::__log_line!("{prefix}┃{message}\n", "") };
}

/// Application header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::__log_line!(
            "{prefix}┏ salat v{message} ━━╸\n",
            "{}",
            env!("CARGO_PKG_VERSION")
        )
    };
}

/// Final termination marker.
#[macro_export]
macro_rules! log_end {
    () => { $crate::__log_line!("{prefix}╹{message}\n", "") };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => { $crate::__log_line!("{prefix}┣[\x1b[32mINFO\x1b[0m] {message}\n", $($arg)+) };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => { $crate::__log_line!("{prefix}┣[\x1b[36mDEBUG\x1b[0m] {message}\n", $($arg)+) };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)+) => { $crate::__log_line!("{prefix}┣[\x1b[33mWARNING\x1b[0m] {message}\n", $($arg)+) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => { $crate::__log_line!("{prefix}┣[\x1b[31mERROR\x1b[0m] {message}\n", $($arg)+) };
}

/// Error that terminates the current flow: spacer then `┗[ERROR] message`.
#[macro_export]
macro_rules! log_error_exit {
    ($($arg:tt)+) => { $crate::__log_line!("{prefix}┃\n{prefix}┗[\x1b[31mERROR\x1b[0m] {message}\n", $($arg)+) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_codes() {
        assert_eq!(
            strip_ansi_codes("┣[\x1b[33mWARNING\x1b[0m] cache miss"),
            "┣[WARNING] cache miss"
        );
        assert_eq!(strip_ansi_codes("plain"), "plain");
        assert_eq!(strip_ansi_codes("\x1bX"), "\x1bX");
    }

    #[test]
    fn test_enable_toggle() {
        Log::set_enabled(false);
        assert!(!Log::is_enabled());
        Log::set_enabled(true);
        assert!(Log::is_enabled());
    }
}
