//! CLI entrypoint for the glance server supervisor.
//!
//! The binary delegates to [`glance_control::run`], which parses the command
//! line and drives the requested lifecycle command against each selected
//! server.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    glance_control::run(std::env::args_os(), &mut stdout, &mut stderr)
}
