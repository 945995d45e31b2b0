//! `salat times`: resolve and print today's prayer table.

use anyhow::{Context, Result};

use crate::args::GlobalOptions;
use crate::common::utils::format_coordinates;
use crate::display::{format_time_12h, hijri_label, today_label};
use crate::prayer::selector::select_next;
use crate::prayer::service::ResolutionSource;

pub fn handle_times_command(options: &GlobalOptions) -> Result<()> {
    log_version!();

    let config = super::load_config(options)?;
    let clock = super::init_clock(options)?;
    let coordinate = super::current_coordinate(&config, options)?;
    let service = super::build_service(&config, clock.clone(), options.debug_enabled)?;

    log_block_start!("Resolving prayer times for {}", format_coordinates(coordinate.latitude, coordinate.longitude));
    let resolution = service
        .resolve(coordinate)
        .context(crate::common::constants::FETCH_ERROR_MESSAGE)?;

    let now = clock.now();
    let next = select_next(&resolution.events, now);

    log_block_start!("{} · {}", today_label(resolution.day), hijri_label(resolution.day));
    log_indented!(
        "Method: {} ({}){}",
        resolution.method,
        resolution.method.describe(),
        match resolution.source {
            ResolutionSource::Cache => " · cached",
            ResolutionSource::Remote => "",
        }
    );
    log_pipe!();

    for event in &resolution.events {
        let marker = if next.is_some_and(|n| n.name == event.name) {
            "  ◀ next"
        } else {
            ""
        };
        log_decorated!(
            "{:<8} {}  {:>8}{marker}",
            event.label(),
            event.time,
            format_time_12h(&event.time)
        );
    }

    log_end!();
    Ok(())
}
