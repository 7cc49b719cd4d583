//! Lifecycle command types and output abstractions.
//!
//! Defines the payloads and IO wrappers shared across lifecycle commands so the
//! controller can remain agnostic of concrete writers.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use glance_config::ServerSelection;
use strum::{Display, EnumString, VariantNames};

use super::LifecycleError;

/// Supported lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "kebab-case")]
pub enum LifecycleCommand {
    /// Launch servers that are not already running.
    Start,
    /// Terminate servers with `SIGTERM`.
    Stop,
    /// Ask servers to finish in-flight work and exit.
    Shutdown,
    /// Stop, then start.
    Restart,
    /// Graceful shutdown, then start.
    Reload,
    /// Alias of [`LifecycleCommand::Reload`].
    ForceReload,
    /// Report whether each server is running without changing anything.
    Status,
}

impl LifecycleCommand {
    /// Whether the command launches servers and therefore uses a config path.
    #[must_use]
    pub const fn launches(self) -> bool {
        matches!(
            self,
            Self::Start | Self::Restart | Self::Reload | Self::ForceReload
        )
    }
}

/// Invocation payload forwarded from the CLI runtime.
#[derive(Debug, Clone)]
pub struct LifecycleInvocation {
    /// Servers targeted by the command.
    pub selection: ServerSelection,
    /// Command applied to each server in turn.
    pub command: LifecycleCommand,
    /// Configuration path handed to launched servers, as typed by the user.
    pub conf_file: Option<PathBuf>,
}

/// Result of a lifecycle invocation once every targeted server was handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandReport {
    exit_status: Option<i32>,
}

impl CommandReport {
    /// Folds a per-server exit status into the report.
    ///
    /// Zero statuses never clear an earlier failure; the most recent non-zero
    /// status wins.
    pub fn record(&mut self, status: Option<i32>) {
        if let Some(code) = status.filter(|code| *code != 0) {
            self.exit_status = Some(code);
        }
    }

    /// The captured non-zero child status, if any.
    #[cfg(test)]
    #[must_use]
    pub const fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    /// Maps the report onto the process exit code.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self.exit_status {
            None => ExitCode::SUCCESS,
            Some(code) => u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from),
        }
    }
}

/// Output handle abstracting over stdout/stderr writers.
pub struct LifecycleOutput<W: Write, E: Write> {
    /// Destination for progress lines.
    pub stdout: W,
    /// Destination for per-server failures.
    pub stderr: E,
}

impl<W: Write, E: Write> LifecycleOutput<W, E> {
    /// Wraps a pair of writers.
    pub const fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    /// Writes one line to stdout and flushes it.
    pub fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stdout.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stdout.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stdout.flush().map_err(LifecycleError::Io)
    }

    /// Writes one line to stderr and flushes it.
    pub fn stderr_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stderr.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stderr.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stderr.flush().map_err(LifecycleError::Io)
    }
}
