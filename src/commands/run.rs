//! `salat run`: long-running tracking session.
//!
//! Wires the location source, tracker, widget sink and countdown together,
//! then waits for signals. The main loop also watches the calendar: once the
//! local date moves past the published day, it asks the tracker to refresh.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use crate::args::GlobalOptions;
use crate::common::constants::COUNTDOWN_TICK;
use crate::countdown::{CountdownTick, CountdownTicker};
use crate::display::{format_time_12h, starts_in_label};
use crate::logger::{Log, write_output};
use crate::signals::{SignalMessage, setup_signal_handler};
use crate::state::{self, AppSnapshot};
use crate::tracking::{Tracker, TrackingController};
use crate::widget;

/// How often the main loop wakes to check the calendar.
const CALENDAR_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Wait between day-refresh attempts while the snapshot stays stale.
const REFRESH_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Decides when the published day is old enough to ask for a refresh.
///
/// Keeps asking while the snapshot stays stale, at most once per
/// `retry_interval`, so a failed refresh is retried instead of leaving
/// yesterday's times in place until the next midnight.
#[derive(Debug)]
struct DayRefresh {
    retry_interval: Duration,
    last_attempt: Option<Instant>,
}

impl DayRefresh {
    fn new(retry_interval: Duration) -> Self {
        Self {
            retry_interval,
            last_attempt: None,
        }
    }

    fn should_refresh(&mut self, snapshot: &AppSnapshot, today: NaiveDate, now: Instant) -> bool {
        if !snapshot.is_stale(today) {
            self.last_attempt = None;
            return false;
        }
        if snapshot.loading {
            return false;
        }
        if let Some(last) = self.last_attempt
            && now.duration_since(last) < self.retry_interval
        {
            return false;
        }
        self.last_attempt = Some(now);
        true
    }
}

pub fn handle_run_command(options: &GlobalOptions) -> Result<()> {
    log_version!();
    if options.debug_enabled {
        log_pipe!();
        log_debug!("Debug mode enabled");
    }

    let signal_state = setup_signal_handler(options.debug_enabled)?;

    let config = super::load_config(options)?;
    config.log_config();

    let clock = super::init_clock(options)?;
    let provider = super::location_provider(&config, options)?;
    let service = super::build_service(&config, clock.clone(), options.debug_enabled)?;

    config.prepare_widget_dir()?;
    let widget_dir = config.widget_dir();
    let sink = widget::select_sink(widget_dir.as_deref());
    log_block_start!("Widget bridge: {}", sink.name());

    let (writer, reader) = state::channel(AppSnapshot::new(config.sound()));
    let tracker = Tracker::new(service, writer, sink, config.movement_threshold())
        .with_debug(options.debug_enabled);

    let controller =
        TrackingController::start(provider, tracker).context("Failed to start location tracking")?;

    let live_line = !Log::is_file_logging();
    let ticker = CountdownTicker::start(reader.clone(), clock.clone(), COUNTDOWN_TICK, move |tick| {
        render_tick(tick, live_line)
    })?;

    let updates = reader.subscribe();
    let mut last_error: Option<String> = None;
    let mut day_refresh = DayRefresh::new(REFRESH_RETRY_INTERVAL);

    while signal_state.running.load(Ordering::SeqCst) {
        match signal_state
            .signal_receiver
            .recv_timeout(CALENDAR_CHECK_INTERVAL)
        {
            Ok(SignalMessage::Shutdown) => break,
            Ok(SignalMessage::Refresh) => controller.refresh(),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        for snapshot in updates.try_iter() {
            if snapshot.error != last_error {
                if let Some(message) = &snapshot.error {
                    end_live_line(live_line);
                    log_pipe!();
                    log_warning!("{message}");
                }
                last_error = snapshot.error.clone();
            }
        }

        if day_refresh.should_refresh(&reader.snapshot(), clock.today(), Instant::now()) {
            controller.refresh();
        }
    }

    end_live_line(live_line);
    ticker.stop();
    controller.stop()?;

    log_block_start!("Stopped tracking");
    log_end!();
    Ok(())
}

fn render_tick(tick: &CountdownTick, live_line: bool) {
    let line = match &tick.fact {
        Some(fact) => format!(
            "{} {} · {} · {}",
            fact.event.label(),
            format_time_12h(&fact.event.time),
            tick.text,
            starts_in_label(tick.remaining)
        ),
        None => tick.text.clone(),
    };

    if live_line {
        write_output(&format!("\r\x1b[2K┃ {line}"));
    } else if tick.remaining % 60 == 0 {
        // Files get one line a minute instead of a redraw every second
        log_indented!("{line}");
    }
}

fn end_live_line(live_line: bool) {
    if live_line {
        write_output("\n");
    }
}
