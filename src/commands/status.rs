//! `salat status`: show what the home-screen widget currently displays.
//!
//! Reads the shared store exactly like the widget does and renders the same
//! countdown from it. Works whether or not a `salat run` is active.

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::args::GlobalOptions;
use crate::common::utils::private_path;
use crate::countdown::format_hms;
use crate::display::{format_time_12h, starts_in_label};
use crate::widget::{WidgetPayload, read_payload};

pub fn handle_status_command(options: &GlobalOptions) -> Result<()> {
    let config = super::load_config(options)?;
    let clock = super::init_clock(options)?;

    let Some(dir) = config.widget_dir() else {
        anyhow::bail!("Could not determine the widget store directory");
    };

    log_version!();

    let Some(payload) = read_payload(&dir)? else {
        log_block_start!("No widget data in {}", private_path(&dir));
        log_indented!("Start 'salat run' with widget_dir configured to publish");
        log_end!();
        return Ok(());
    };

    render(&payload, clock.now());
    log_end!();
    Ok(())
}

/// Where the stored target stands relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetStatus {
    /// Seconds left.
    Upcoming(i64),
    /// Seconds since the target; the store has not been refreshed since.
    Passed(i64),
    Unreadable,
}

/// The stored target is already pushed past a wrap, so it is used as is.
fn target_status(payload: &WidgetPayload, now: DateTime<Local>) -> TargetStatus {
    match payload.target() {
        Some(target) if target > now => {
            TargetStatus::Upcoming((target - now).num_milliseconds().div_euclid(1000))
        }
        Some(target) => TargetStatus::Passed((now - target).num_seconds()),
        None => TargetStatus::Unreadable,
    }
}

fn render(payload: &WidgetPayload, now: DateTime<Local>) {
    match target_status(payload, now) {
        TargetStatus::Upcoming(remaining) => {
            log_block_start!(
                "Next prayer: {} · {}",
                payload.next_prayer_name,
                format_hms(remaining)
            );
            log_indented!("{}", starts_in_label(remaining));
        }
        TargetStatus::Passed(elapsed) => {
            log_block_start!("Last published: {}", payload.next_prayer_name);
            log_warning!(
                "Widget data is stale: {} passed {} ago",
                payload.next_prayer_name,
                format_hms(elapsed)
            );
        }
        TargetStatus::Unreadable => {
            log_block_start!("Next prayer: {}", payload.next_prayer_name);
            log_warning!("Unreadable target time: {}", payload.next_prayer_time);
        }
    }

    log_pipe!();
    for row in &payload.prayer_times {
        let marker = if row.name == payload.next_prayer_name {
            "  ◀"
        } else {
            ""
        };
        log_decorated!("{:<8} {:>8}{marker}", row.name, format_time_12h(&row.time));
    }

    if let Ok(updated) = DateTime::parse_from_rfc3339(&payload.updated_at) {
        log_pipe!();
        log_indented!(
            "Updated {}",
            updated.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_source::parse_datetime;

    fn payload(target: &str) -> WidgetPayload {
        WidgetPayload {
            next_prayer_name: "Fajr".to_string(),
            next_prayer_time: target.to_string(),
            prayer_times: Vec::new(),
            updated_at: parse_datetime("2026-02-18 20:00:00").unwrap().to_rfc3339(),
        }
    }

    #[test]
    fn test_wrapped_target_counts_down_without_another_day() {
        let target = parse_datetime("2026-02-19 05:12:00").unwrap().to_rfc3339();
        let now = parse_datetime("2026-02-18 23:00:00").unwrap();
        assert_eq!(
            target_status(&payload(&target), now),
            TargetStatus::Upcoming(6 * 3600 + 12 * 60)
        );
    }

    #[test]
    fn test_old_store_is_reported_as_stale() {
        let target = parse_datetime("2026-02-19 05:12:00").unwrap().to_rfc3339();
        let now = parse_datetime("2026-02-20 06:12:00").unwrap();
        assert_eq!(
            target_status(&payload(&target), now),
            TargetStatus::Passed(25 * 3600)
        );
    }

    #[test]
    fn test_unreadable_target() {
        let now = parse_datetime("2026-02-18 23:00:00").unwrap();
        assert_eq!(target_status(&payload("soon"), now), TargetStatus::Unreadable);
    }
}
