//! Destinations for a launched server's standard output and error.

use std::os::fd::OwnedFd;
use std::process::{Command, Stdio};

use glance_config::ServerName;
use tracing::warn;

use super::LIFECYCLE_TARGET;
use super::spawning::Redirect;

const LOGGER_BINARY: &str = "logger";

/// Where server output ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputSink {
    /// Output is discarded.
    Discard,
    /// Output is forwarded to the system log through `logger(1)`.
    Syslog,
}

impl OutputSink {
    pub(crate) const fn from_capture_flag(capture_output: bool) -> Self {
        if capture_output {
            Self::Syslog
        } else {
            Self::Discard
        }
    }

    /// Opens the sink, returning the stdout and stderr redirects for `server`.
    ///
    /// A log forwarder that cannot be started degrades to discarding output.
    pub(crate) fn open(self, server: ServerName, launcher_pid: u32) -> (Redirect, Redirect) {
        match self {
            Self::Discard => (Redirect::Null, Redirect::Null),
            Self::Syslog => match spawn_logger(server, launcher_pid) {
                Ok((stdout, stderr)) => (Redirect::Fd(stdout), Redirect::Fd(stderr)),
                Err(error) => {
                    warn!(
                        target: LIFECYCLE_TARGET,
                        %server,
                        %error,
                        "unable to start log forwarder; discarding server output"
                    );
                    (Redirect::Null, Redirect::Null)
                }
            },
        }
    }
}

/// Starts `logger -t <server>[<pid>]` and hands back two write ends of its
/// stdin pipe.
fn spawn_logger(server: ServerName, launcher_pid: u32) -> std::io::Result<(OwnedFd, OwnedFd)> {
    let mut logger = Command::new(LOGGER_BINARY)
        .arg("-t")
        .arg(syslog_tag(server, launcher_pid))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    let pipe = logger.stdin.take().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "logger stdin unavailable")
    })?;
    let stdout = OwnedFd::from(pipe);
    let stderr = stdout.try_clone()?;
    Ok((stdout, stderr))
}

fn syslog_tag(server: ServerName, launcher_pid: u32) -> String {
    format!("{server}[{launcher_pid}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_flag_selects_the_sink() {
        assert_eq!(OutputSink::from_capture_flag(false), OutputSink::Discard);
        assert_eq!(OutputSink::from_capture_flag(true), OutputSink::Syslog);
    }

    #[test]
    fn discarding_sink_redirects_to_null() {
        let (stdout, stderr) = OutputSink::Discard.open(ServerName::Api, 1);
        assert!(matches!(stdout, Redirect::Null));
        assert!(matches!(stderr, Redirect::Null));
    }

    #[test]
    fn syslog_tag_names_server_and_launcher() {
        assert_eq!(syslog_tag(ServerName::Scrubber, 812), "glance-scrubber[812]");
    }
}
