//! Command-line runtime for the glance server supervisor.
//!
//! The runtime parses arguments, installs telemetry and hands the resulting
//! lifecycle invocation to a handler. The handler is injectable so tests can
//! drive the runtime without touching real processes.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use glance_config::Config;

mod cli;
mod errors;
mod lifecycle;
pub mod telemetry;

use cli::Cli;
use errors::AppError;
use lifecycle::{
    CommandReport, LifecycleError, LifecycleInvocation, LifecycleOutput, SystemLifecycle,
};

/// Runs the supervisor using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut lifecycle = SystemLifecycle;
    run_with_handler(args, stdout, stderr, |invocation, config, output| {
        lifecycle.handle(invocation, config, output)
    })
}

/// Runs the supervisor with a custom lifecycle handler.
pub(crate) fn run_with_handler<I, W, E, F>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    mut handler: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    F: FnMut(
        &LifecycleInvocation,
        &Config,
        &mut LifecycleOutput<&mut W, &mut E>,
    ) -> Result<CommandReport, LifecycleError>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if is_informational(&error) => {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            let _ = write!(stderr, "{}", AppError::CliUsage(error));
            return ExitCode::FAILURE;
        }
    };

    let result = LifecycleInvocation::try_from(&cli).and_then(|invocation| {
        telemetry::initialise(&cli.config)?;
        let mut output = LifecycleOutput::new(&mut *stdout, &mut *stderr);
        handler(&invocation, &cli.config, &mut output).map_err(AppError::from)
    });

    match result {
        Ok(report) => report.exit_code(),
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            if error.wants_usage() {
                let _ = writeln!(stderr, "{}", Cli::command().render_usage());
            }
            ExitCode::FAILURE
        }
    }
}

/// Help and version requests surface as clap errors but are not failures.
fn is_informational(error: &clap::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
    )
}
