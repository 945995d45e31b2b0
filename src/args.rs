//! Command-line argument parsing.
//!
//! Hand-rolled on purpose: the surface is a handful of subcommands plus a few
//! global flags, and unknown input should produce a friendly warning followed
//! by the help text rather than a parser error dump.

/// Flags accepted by every command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalOptions {
    pub debug_enabled: bool,
    pub config_dir: Option<String>,
    pub log_file: Option<String>,
    /// Fixed wall time, "YYYY-MM-DD HH:MM:SS".
    pub at: Option<String>,
    /// `--lat`/`--lon` override of the configured location.
    pub location: Option<(f64, f64)>,
}

/// What the binary should do.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Track location, publish, show a live countdown until interrupted
    Run { options: GlobalOptions },
    /// Print today's prayer table once
    Times { options: GlobalOptions },
    /// Print the next prayer and its countdown once
    Next { options: GlobalOptions },
    /// Print the calculation method for a country code
    Method {
        options: GlobalOptions,
        country: String,
    },
    /// Read the widget store and print what the widget would show
    Status { options: GlobalOptions },
    ShowHelp,
    ShowVersion,
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse arguments, the first of which is the program name.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        // Help and version take precedence over everything else
        if args_vec
            .iter()
            .any(|arg| arg == "--version" || arg == "-V" || arg == "-v")
        {
            return ParsedArgs {
                action: CliAction::ShowVersion,
            };
        }
        if args_vec.iter().any(|arg| arg == "--help" || arg == "-h") {
            return ParsedArgs {
                action: CliAction::ShowHelp,
            };
        }

        let mut options = GlobalOptions::default();
        let mut positionals: Vec<String> = Vec::new();
        let mut latitude: Option<f64> = None;
        let mut longitude: Option<f64> = None;

        let mut i = 0;
        while i < args_vec.len() {
            let arg = args_vec[i].as_str();
            match arg {
                "--debug" | "-d" => options.debug_enabled = true,
                "--config" | "-c" | "--log" | "-l" | "--at" => {
                    let Some(value) = args_vec.get(i + 1).filter(|v| !v.starts_with('-')) else {
                        log_warning!("Missing value for {arg}");
                        return error();
                    };
                    match arg {
                        "--config" | "-c" => options.config_dir = Some(value.clone()),
                        "--log" | "-l" => options.log_file = Some(value.clone()),
                        _ => options.at = Some(value.clone()),
                    }
                    i += 1;
                }
                "--lat" | "--lon" => {
                    // Values may be negative, so no leading '-' check here
                    let Some(value) = args_vec.get(i + 1).and_then(|v| v.parse::<f64>().ok())
                    else {
                        log_warning!("{arg} needs a number of degrees");
                        return error();
                    };
                    if arg == "--lat" {
                        latitude = Some(value);
                    } else {
                        longitude = Some(value);
                    }
                    i += 1;
                }
                _ if arg.starts_with('-') => {
                    log_warning!("Unknown option: {arg}");
                    return error();
                }
                _ => positionals.push(arg.to_string()),
            }
            i += 1;
        }

        match (latitude, longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    log_warning!("Coordinates out of range: {lat}, {lon}");
                    return error();
                }
                options.location = Some((lat, lon));
            }
            (None, None) => {}
            _ => {
                log_warning!("--lat and --lon must be given together");
                return error();
            }
        }

        let mut positionals = positionals.into_iter();
        let command = positionals.next();
        let rest: Vec<String> = positionals.collect();

        let action = match command.as_deref() {
            None => CliAction::Run { options },
            Some("run") | Some("r") if rest.is_empty() => CliAction::Run { options },
            Some("times") | Some("t") if rest.is_empty() => CliAction::Times { options },
            Some("next") | Some("n") if rest.is_empty() => CliAction::Next { options },
            Some("status") | Some("s") if rest.is_empty() => CliAction::Status { options },
            Some("method") | Some("m") => match rest.as_slice() {
                [country] => CliAction::Method {
                    options,
                    country: country.clone(),
                },
                _ => {
                    log_warning!("Usage: salat method <country-code>");
                    return error();
                }
            },
            Some(command @ ("run" | "r" | "times" | "t" | "next" | "n" | "status" | "s")) => {
                log_warning!("'{command}' takes no arguments (got: {})", rest.join(" "));
                return error();
            }
            Some(command) => {
                log_warning!("Unknown command: {command}");
                return error();
            }
        };

        ParsedArgs { action }
    }

    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

fn error() -> ParsedArgs {
    ParsedArgs {
        action: CliAction::ShowHelpDueToError,
    }
}

/// Displays version information using the logger's style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    crate::logger::write_output(&format!("┗ {}\n", env!("CARGO_PKG_DESCRIPTION")));
}

/// Displays the help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!("{}", env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("salat [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-l, --log <file>       Write output to a file instead of stdout");
    log_indented!("    --at <datetime>    Run at a fixed time (\"YYYY-MM-DD HH:MM:SS\")");
    log_indented!("    --lat <deg>        Latitude override (with --lon)");
    log_indented!("    --lon <deg>        Longitude override (with --lat)");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("run, r                 Track location and show a live countdown (default)");
    log_indented!("times, t               Print today's prayer times");
    log_indented!("next, n                Print the next prayer and time remaining");
    log_indented!("method, m <CC>         Show the calculation method for a country");
    log_indented!("status, s              Show what the home-screen widget currently displays");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliAction {
        let mut full = vec!["salat"];
        full.extend_from_slice(args);
        ParsedArgs::parse(full).action
    }

    #[test]
    fn test_parse_no_args_runs() {
        assert_eq!(
            parse(&[]),
            CliAction::Run {
                options: GlobalOptions::default()
            }
        );
    }

    #[test]
    fn test_parse_debug_flag_anywhere() {
        let expected = CliAction::Times {
            options: GlobalOptions {
                debug_enabled: true,
                ..GlobalOptions::default()
            },
        };
        assert_eq!(parse(&["--debug", "times"]), expected);
        assert_eq!(parse(&["times", "-d"]), expected);
    }

    #[test]
    fn test_parse_global_values() {
        let action = parse(&[
            "next",
            "--config",
            "/tmp/salat",
            "--log",
            "out.log",
            "--at",
            "2026-02-18 16:00:00",
        ]);
        assert_eq!(
            action,
            CliAction::Next {
                options: GlobalOptions {
                    debug_enabled: false,
                    config_dir: Some("/tmp/salat".to_string()),
                    log_file: Some("out.log".to_string()),
                    at: Some("2026-02-18 16:00:00".to_string()),
                    location: None,
                }
            }
        );
    }

    #[test]
    fn test_parse_negative_coordinates() {
        let action = parse(&["times", "--lat", "-33.8688", "--lon", "151.2093"]);
        let CliAction::Times { options } = action else {
            panic!("expected times, got {action:?}");
        };
        assert_eq!(options.location, Some((-33.8688, 151.2093)));
    }

    #[test]
    fn test_parse_half_location_is_error() {
        assert_eq!(parse(&["times", "--lat", "10"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["times", "--lat", "north"]), CliAction::ShowHelpDueToError);
        assert_eq!(
            parse(&["times", "--lat", "95", "--lon", "0"]),
            CliAction::ShowHelpDueToError
        );
    }

    #[test]
    fn test_parse_method_command() {
        assert_eq!(
            parse(&["method", "eg"]),
            CliAction::Method {
                options: GlobalOptions::default(),
                country: "eg".to_string()
            }
        );
        assert_eq!(parse(&["method"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["m", "EG", "SA"]), CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_short_commands() {
        assert!(matches!(parse(&["r"]), CliAction::Run { .. }));
        assert!(matches!(parse(&["t"]), CliAction::Times { .. }));
        assert!(matches!(parse(&["n"]), CliAction::Next { .. }));
        assert!(matches!(parse(&["s"]), CliAction::Status { .. }));
    }

    #[test]
    fn test_help_and_version_take_precedence() {
        assert_eq!(parse(&["times", "--help"]), CliAction::ShowHelp);
        assert_eq!(parse(&["-h"]), CliAction::ShowHelp);
        assert_eq!(parse(&["next", "-V"]), CliAction::ShowVersion);
    }

    #[test]
    fn test_unknown_input() {
        assert_eq!(parse(&["--frobnicate"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["pray"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["times", "extra"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["--config"]), CliAction::ShowHelpDueToError);
    }
}
