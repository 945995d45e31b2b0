//! `salat method <CC>`: show which calculation method a country maps to.

use anyhow::Result;

use crate::prayer::method::{mapped_countries, resolve_method};

pub fn handle_method_command(country: &str) -> Result<()> {
    let code = country.trim().to_ascii_uppercase();
    let method = resolve_method(Some(&code));
    let mapped = mapped_countries().any(|(c, _)| c == code);

    log_version!();
    log_block_start!("{code} → method {method}");
    log_indented!("{}", method.describe());
    if !mapped {
        log_indented!("No specific mapping; using the default method");
    }
    log_end!();
    Ok(())
}
