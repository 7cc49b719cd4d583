//! Server termination: signal selection, delivery and the death wait.

use std::convert::Infallible;
use std::io::Write;
use std::time::Duration;

use glance_config::ServerName;
use nix::sys::signal::Signal;
use tracing::{debug, info, warn};

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::pidfile::{PidFileStore, PidRecord, remove_pid_file};
use super::poll::PollBudget;
use super::probe::ProcessTable;
use super::types::LifecycleOutput;

/// How long a signalled server is given to exit: 150 probes, 0.1s apart.
pub(crate) const DEATH_WAIT: PollBudget = PollBudget::new(150, Duration::from_millis(100));

/// Signal used to stop `server`.
///
/// Graceful stops send `SIGHUP` to servers that drain in-flight work on it;
/// every other case sends `SIGTERM`.
pub(crate) fn stop_signal(server: ServerName, graceful: bool) -> Signal {
    if graceful && server.supports_graceful_shutdown() {
        Signal::SIGHUP
    } else {
        Signal::SIGTERM
    }
}

/// What a stop request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StopOutcome {
    /// No PID file existed.
    NotRunning,
    /// Every recorded process was signalled.
    ///
    /// `survivors` lists PIDs still alive when the death wait ran out.
    Signalled { pids: Vec<u32>, survivors: Vec<u32> },
}

/// Signals recorded server processes and waits for them to exit.
pub(crate) struct Terminator<'a, P> {
    store: &'a PidFileStore,
    table: &'a P,
    death_wait: PollBudget,
}

impl<'a, P: ProcessTable> Terminator<'a, P> {
    pub(crate) const fn new(store: &'a PidFileStore, table: &'a P) -> Self {
        Self {
            store,
            table,
            death_wait: DEATH_WAIT,
        }
    }

    #[cfg(test)]
    pub(crate) const fn with_death_wait(mut self, death_wait: PollBudget) -> Self {
        self.death_wait = death_wait;
        self
    }

    /// Stops every recorded process of `server`.
    ///
    /// PID files are removed once signalled whether or not delivery worked.
    /// Processes outliving the death wait are reported and left alone.
    pub(crate) fn stop<W: Write, E: Write>(
        &self,
        server: ServerName,
        graceful: bool,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<StopOutcome, LifecycleError> {
        let records = self
            .store
            .records(server)
            .collect::<Result<Vec<PidRecord>, _>>()?;
        if records.is_empty() {
            output.stdout_line(format_args!("{server} is not running"))?;
            return Ok(StopOutcome::NotRunning);
        }

        let signal = stop_signal(server, graceful);
        for record in &records {
            self.deliver(server, record, signal, output)?;
        }

        let mut survivors = Vec::new();
        for record in &records {
            if self.await_death(record.pid()) {
                debug!(
                    target: LIFECYCLE_TARGET,
                    %server,
                    pid = record.pid(),
                    "server exited"
                );
                continue;
            }
            warn!(
                target: LIFECYCLE_TARGET,
                %server,
                pid = record.pid(),
                "server outlived the death wait"
            );
            output.stderr_line(format_args!(
                "Waited {} seconds for pid {} ({}) to die; giving up",
                self.death_wait.ceiling().as_secs(),
                record.pid(),
                server
            ))?;
            survivors.push(record.pid());
        }

        Ok(StopOutcome::Signalled {
            pids: records.iter().map(PidRecord::pid).collect(),
            survivors,
        })
    }

    fn deliver<W: Write, E: Write>(
        &self,
        server: ServerName,
        record: &PidRecord,
        signal: Signal,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<(), LifecycleError> {
        let pid = record.pid();
        output.stdout_line(format_args!(
            "Stopping {server}  pid: {pid}  signal: {signal}"
        ))?;
        match self.table.signal(pid, signal) {
            Ok(()) => info!(
                target: LIFECYCLE_TARGET,
                %server,
                pid,
                %signal,
                "signal delivered"
            ),
            Err(errno) => {
                warn!(
                    target: LIFECYCLE_TARGET,
                    %server,
                    pid,
                    %errno,
                    "signal delivery failed"
                );
                output.stderr_line(format_args!(
                    "failed to signal {server} pid {pid}: {errno}"
                ))?;
            }
        }
        if let Err(error) = remove_pid_file(record.path()) {
            debug!(
                target: LIFECYCLE_TARGET,
                %server,
                file = %record.path().display(),
                %error,
                "pid file removal failed"
            );
        }
        Ok(())
    }

    /// Polls until `pid` is gone, returning `false` once the budget is spent.
    fn await_death(&self, pid: u32) -> bool {
        let gone = self
            .death_wait
            .run(|| Ok::<_, Infallible>((!self.table.is_alive(pid)).then_some(())));
        matches!(gone, Ok(Some(())))
    }
}
