use std::ffi::OsString;

use ac_api::{create_application, Application, ApplicationOptions};
use ac_config::{load_config_dir, ApplicationSettings};
use ac_core::AdminResult;
use ac_runtime::OperationResponse;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli_args;
mod console;
mod error_map;
mod report;

pub(crate) use cli_args::{CheckArgs, Cli, ConsoleArgs, ExecArgs, Mode};
pub(crate) use error_map::{emit_error, map_console_io, map_report_json};
pub(crate) use report::{emit_check, emit_response, CheckReport};

const DEFAULT_LOG_FILTER: &str = "warn";

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> AdminResult<i32> {
    match cli.command {
        Mode::Exec(args) => run_exec(args),
        Mode::Console(args) => run_console(args),
        Mode::Check(args) => run_check(args),
    }
}

fn run_exec(args: ExecArgs) -> AdminResult<i32> {
    let application = load_application(&args.config_dir)?;
    let response = execute_as(&application, args.user.as_deref(), &args.line)?;
    Ok(emit_response(&response))
}

fn run_console(args: ConsoleArgs) -> AdminResult<i32> {
    let application = load_application(&args.config_dir)?;
    console::run_console(&application, args.user.as_deref())
}

fn run_check(args: CheckArgs) -> AdminResult<i32> {
    let application = load_application(&args.config_dir)?;
    emit_check(&CheckReport::of(&application))
}

fn load_application(config_dir: &str) -> AdminResult<Application> {
    let directory = load_config_dir(config_dir)?;
    init_logging(&directory.settings);
    create_application(ApplicationOptions::from(directory))
}

/// `RUST_LOG` wins over the configured filter. Logs go to stderr so that
/// stdout only carries results.
fn init_logging(settings: &ApplicationSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(settings.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
    });
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

pub(crate) fn execute_as(
    application: &Application,
    user: Option<&str>,
    line: &str,
) -> AdminResult<OperationResponse> {
    match user {
        Some(user) => application.execute_line_as(user, line),
        None => Ok(application.execute_line(line)),
    }
}

#[cfg(test)]
mod tests;
