//! Option group recognised by the supervisor binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;

use crate::defaults::{DEFAULT_LOG_FILTER, DEFAULT_PID_DIR, default_log_format};
use crate::logging::LogFormat;

/// Resolved settings for a single invocation.
///
/// The struct doubles as a `clap` argument group so the CLI can flatten it
/// straight into its parser. Fields stay public so tests can build
/// configurations with struct-update syntax.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct Config {
    /// Location of the PID file; overrides the per-server default for every
    /// targeted server.
    #[arg(long = "pid-file", value_name = "PATH")]
    pub pid_file: Option<PathBuf>,
    /// Directory holding per-server PID files.
    #[arg(
        long = "pid-dir",
        value_name = "DIR",
        env = "GLANCE_PID_DIR",
        default_value = DEFAULT_PID_DIR
    )]
    pub pid_dir: PathBuf,
    /// Seconds to wait for a freshly launched server to exit early; 0 disables
    /// the wait.
    #[arg(long = "await-child", value_name = "DELAY", default_value_t = 0)]
    pub await_child: u64,
    /// Forward server stdout/stderr to the system log instead of discarding it.
    #[arg(long = "capture-output")]
    pub capture_output: bool,
    /// Directory containing the server executables; the `PATH` is searched
    /// when omitted.
    #[arg(long = "bin-dir", value_name = "DIR", env = "GLANCE_BIN_DIR")]
    pub bin_dir: Option<PathBuf>,
    /// Tracing filter expression for diagnostic logging.
    #[arg(
        long = "log-filter",
        value_name = "FILTER",
        env = "GLANCE_LOG_FILTER",
        default_value = DEFAULT_LOG_FILTER
    )]
    pub log_filter: String,
    /// Output format for diagnostic logging.
    #[arg(
        long = "log-format",
        value_name = "FORMAT",
        env = "GLANCE_LOG_FORMAT",
        value_enum,
        default_value_t = default_log_format()
    )]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pid_file: None,
            pid_dir: PathBuf::from(DEFAULT_PID_DIR),
            await_child: 0,
            capture_output: false,
            bin_dir: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Explicit PID file shared by every server, if configured.
    #[must_use]
    pub fn pid_file(&self) -> Option<&Path> {
        self.pid_file.as_deref()
    }

    /// Directory holding per-server PID files.
    #[must_use]
    pub fn pid_dir(&self) -> &Path {
        &self.pid_dir
    }

    /// Window during which an early child exit is captured.
    ///
    /// A zero duration means the launcher does not wait at all.
    #[must_use]
    pub const fn await_child(&self) -> Duration {
        Duration::from_secs(self.await_child)
    }

    /// Whether server output is forwarded to the system log.
    #[must_use]
    pub const fn capture_output(&self) -> bool {
        self.capture_output
    }

    /// Directory containing server executables, if configured.
    #[must_use]
    pub fn bin_dir(&self) -> Option<&Path> {
        self.bin_dir.as_deref()
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Diagnostic log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
