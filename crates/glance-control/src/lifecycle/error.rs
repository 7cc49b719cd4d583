//! Error types for server lifecycle operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a lifecycle invocation.
///
/// Conditions the supervisor absorbs (stale PID files, vanished processes,
/// death-wait timeouts, unlaunchable binaries) are reported as output lines
/// instead and never surface here.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to read pid file {path:?}: {source}")]
    ReadPid {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse pid file {path:?}: {source}")]
    ParsePid {
        path: PathBuf,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("unable to create pid file directory {path:?}: {source}")]
    PidDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write pid file {path:?}: {source}")]
    PidWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove stale pid file {path:?}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to monitor launched server pid {pid}: {source}")]
    MonitorChild {
        pid: u32,
        #[source]
        source: io::Error,
    },
    #[error("failed to write lifecycle output: {0}")]
    Io(#[source] io::Error),
}
