//! `salat next`: the next prayer and the time left until it.

use anyhow::{Context, Result};

use crate::args::GlobalOptions;
use crate::countdown::{format_hms, remaining_seconds};
use crate::display::{format_time_12h, starts_in_label};
use crate::prayer::selector::{is_wrapped, select_next};

pub fn handle_next_command(options: &GlobalOptions) -> Result<()> {
    log_version!();

    let config = super::load_config(options)?;
    let clock = super::init_clock(options)?;
    let coordinate = super::current_coordinate(&config, options)?;
    let service = super::build_service(&config, clock.clone(), options.debug_enabled)?;

    let resolution = service
        .resolve(coordinate)
        .context(crate::common::constants::FETCH_ERROR_MESSAGE)?;

    let now = clock.now();
    let Some(next) = select_next(&resolution.events, now) else {
        anyhow::bail!("No prayer times were returned for today");
    };

    let remaining = remaining_seconds(next.instant, now);
    let when = if is_wrapped(next, now) {
        format!("{} tomorrow", format_time_12h(&next.time))
    } else {
        format_time_12h(&next.time)
    };

    log_block_start!("Next prayer: {} at {when}", next.label());
    log_indented!("{}", starts_in_label(remaining));
    log_indented!("Countdown: {}", format_hms(remaining));
    log_end!();
    Ok(())
}
