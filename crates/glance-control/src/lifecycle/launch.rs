//! Server launch sequencing: stale PID reclamation, spawning, PID recording
//! and the optional await-child window.

use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glance_config::{Config, EGG_CACHE_ENV_VAR, ServerName};
use tracing::{debug, info, warn};

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::pidfile::{PidFileStore, remove_pid_file};
use super::poll::PollBudget;
use super::probe::ProcessTable;
use super::sink::OutputSink;
use super::spawning::{ChildHandle, Redirect, SpawnSpec, Spawner};
use super::types::LifecycleOutput;

const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit status attributed to a server whose binary could not be executed.
const LAUNCH_FAILURE_STATUS: i32 = 1;

/// What happened when a server was asked to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartOutcome {
    /// A live process already holds the PID file; nothing was launched.
    AlreadyRunning { pid: u32 },
    /// The server was launched and its PID recorded.
    ///
    /// `exit_status` is set when the server exited inside the await-child
    /// window.
    Started { pid: u32, exit_status: Option<i32> },
    /// The server binary could not be executed.
    LaunchFailed { exit_status: Option<i32> },
}

impl StartOutcome {
    /// Status contributed to the invocation's exit code.
    pub(crate) const fn exit_status(self) -> Option<i32> {
        match self {
            Self::AlreadyRunning { .. } => None,
            Self::Started { exit_status, .. } | Self::LaunchFailed { exit_status } => exit_status,
        }
    }
}

/// Starts servers and records their PIDs.
pub(crate) struct Launcher<'a, P, S> {
    config: &'a Config,
    store: &'a PidFileStore,
    table: &'a P,
    spawner: &'a S,
    sink: OutputSink,
    launcher_pid: u32,
}

impl<'a, P, S> Launcher<'a, P, S>
where
    P: ProcessTable,
    S: Spawner,
{
    pub(crate) fn new(
        config: &'a Config,
        store: &'a PidFileStore,
        table: &'a P,
        spawner: &'a S,
    ) -> Self {
        Self {
            config,
            store,
            table,
            spawner,
            sink: OutputSink::from_capture_flag(config.capture_output()),
            launcher_pid: std::process::id(),
        }
    }

    /// Starts `server` unless a live instance is already recorded.
    pub(crate) fn start<W: Write, E: Write>(
        &self,
        server: ServerName,
        conf_file: Option<&Path>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<StartOutcome, LifecycleError> {
        if let Some(pid) = self.reclaim(server, output)? {
            return Ok(StartOutcome::AlreadyRunning { pid });
        }
        self.store.prepare_directory(server)?;

        match conf_file {
            Some(conf) => output.stdout_line(format_args!(
                "Starting {server} with {}",
                conf.display()
            ))?,
            None => output.stdout_line(format_args!("Starting {server}"))?,
        }

        let mut child = match self.spawner.spawn(self.spawn_spec(server, conf_file)) {
            Ok(child) => child,
            Err(error) => {
                warn!(
                    target: LIFECYCLE_TARGET,
                    %server,
                    %error,
                    "server binary could not be executed"
                );
                output.stderr_line(format_args!("unable to launch {server}: {error}"))?;
                let exit_status =
                    (!self.config.await_child().is_zero()).then_some(LAUNCH_FAILURE_STATUS);
                return Ok(StartOutcome::LaunchFailed { exit_status });
            }
        };

        let pid = child.id();
        self.store.write(server, pid)?;
        let exit_status = self.await_child(child.as_mut())?;
        if let Some(code) = exit_status {
            output.stderr_line(format_args!(
                "{server} (pid {pid}) exited during startup with status {code}"
            ))?;
        }
        Ok(StartOutcome::Started { pid, exit_status })
    }

    /// Checks existing records, returning the PID of a live instance.
    ///
    /// Records whose process is gone are deleted so the launch can proceed.
    fn reclaim<W: Write, E: Write>(
        &self,
        server: ServerName,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<Option<u32>, LifecycleError> {
        for entry in self.store.records(server) {
            let record = entry?;
            if self.table.is_alive(record.pid()) {
                info!(
                    target: LIFECYCLE_TARGET,
                    %server,
                    pid = record.pid(),
                    "refusing to start: existing server alive"
                );
                output.stdout_line(format_args!(
                    "{server} appears to already be running: {}",
                    record.path().display()
                ))?;
                return Ok(Some(record.pid()));
            }
            info!(
                target: LIFECYCLE_TARGET,
                %server,
                pid = record.pid(),
                file = %record.path().display(),
                "removing stale pid file"
            );
            remove_pid_file(record.path()).map_err(|source| LifecycleError::Cleanup {
                path: record.path().to_path_buf(),
                source,
            })?;
        }
        Ok(None)
    }

    fn await_child(&self, child: &mut dyn ChildHandle) -> Result<Option<i32>, LifecycleError> {
        let window = self.config.await_child();
        if window.is_zero() {
            return Ok(None);
        }
        let pid = child.id();
        debug!(
            target: LIFECYCLE_TARGET,
            pid,
            window_ms = window.as_millis(),
            "awaiting early child exit"
        );
        PollBudget::within(window, CHILD_POLL_INTERVAL)
            .run(|| child.try_exit_code())
            .map_err(|source| LifecycleError::MonitorChild { pid, source })
    }

    fn spawn_spec(&self, server: ServerName, conf_file: Option<&Path>) -> SpawnSpec {
        let executable = match self.config.bin_dir() {
            Some(dir) => dir.join(server.binary_name()),
            None => PathBuf::from(server.binary_name()),
        };
        let args = conf_file
            .map(|conf| vec![OsString::from("--config-file"), conf.as_os_str().to_owned()])
            .unwrap_or_default();
        let (stdout, stderr) = self.sink.open(server, self.launcher_pid);
        SpawnSpec {
            executable,
            args,
            env: vec![(
                OsString::from(EGG_CACHE_ENV_VAR),
                env::temp_dir().into_os_string(),
            )],
            stdin: Redirect::Null,
            stdout,
            stderr,
            detach_session: true,
        }
    }
}

/// Resolves a user-supplied configuration path for the launched server.
///
/// Paths that do not exist are dropped silently; existing ones are made
/// absolute so the detached server does not depend on the caller's working
/// directory.
pub(crate) fn resolve_conf_file(conf_file: Option<&Path>) -> Option<PathBuf> {
    let path = conf_file?;
    if !path.exists() {
        debug!(
            target: LIFECYCLE_TARGET,
            path = %path.display(),
            "ignoring missing configuration file"
        );
        return None;
    }
    std::path::absolute(path).ok()
}
