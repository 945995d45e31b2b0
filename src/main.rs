//! Binary entry point: parse arguments and dispatch to a command.

use salat::args::{self, CliAction, GlobalOptions, ParsedArgs};
use salat::commands;
use salat::common::constants::EXIT_FAILURE;
use salat::log_error_exit;
use salat::logger::{Log, LoggerGuard};

fn main() {
    let parsed_args = ParsedArgs::from_env();

    let result = match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Run { options } => with_logging(&options, commands::run::handle_run_command),
        CliAction::Times { options } => {
            with_logging(&options, commands::times::handle_times_command)
        }
        CliAction::Next { options } => with_logging(&options, commands::next::handle_next_command),
        CliAction::Status { options } => {
            with_logging(&options, commands::status::handle_status_command)
        }
        CliAction::Method { options, country } => {
            with_logging(&options, |_| commands::method::handle_method_command(&country))
        }
    };

    if result.is_err() {
        std::process::exit(EXIT_FAILURE);
    }
}

/// Run `handler`, routing output to `--log` when given.
///
/// Errors are reported here so they reach the log file before it is closed.
fn with_logging<F>(options: &GlobalOptions, handler: F) -> Result<(), ()>
where
    F: FnOnce(&GlobalOptions) -> anyhow::Result<()>,
{
    let _guard: Option<LoggerGuard> = match &options.log_file {
        Some(path) => match Log::start_file_logging(path.clone()) {
            Ok(guard) => Some(guard),
            Err(e) => {
                log_error_exit!("Failed to open log file {path}: {e}");
                return Err(());
            }
        },
        None => None,
    };

    handler(options).map_err(|e| {
        log_error_exit!("{e:#}");
    })
}
