//! High-level orchestration for server lifecycle commands.
//!
//! Every command expands the server selection and handles one server fully
//! before moving to the next, so a reload of `all` stops and restarts `api`
//! before touching `registry`.

use std::io::Write;
use std::path::Path;

use glance_config::{Config, ServerName};
use tracing::debug;

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::launch::{Launcher, resolve_conf_file};
use super::pidfile::PidFileStore;
#[cfg(test)]
use super::poll::PollBudget;
use super::probe::{ProcessTable, SystemProcessTable};
use super::shutdown::{StopOutcome, Terminator};
use super::spawning::{Spawner, SystemSpawner};
use super::types::{CommandReport, LifecycleCommand, LifecycleInvocation, LifecycleOutput};

/// Production lifecycle controller.
#[derive(Debug, Default)]
pub struct SystemLifecycle;

impl SystemLifecycle {
    /// Runs `invocation` against the real process table.
    pub fn handle<W: Write, E: Write>(
        &mut self,
        invocation: &LifecycleInvocation,
        config: &Config,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<CommandReport, LifecycleError> {
        let store = PidFileStore::from_config(config);
        LifecycleController::new(config, &store, &SystemProcessTable, &SystemSpawner)
            .run(invocation, output)
    }
}

/// Drives commands over an injectable process table and spawner.
pub(crate) struct LifecycleController<'a, P, S> {
    store: &'a PidFileStore,
    table: &'a P,
    launcher: Launcher<'a, P, S>,
    terminator: Terminator<'a, P>,
}

impl<'a, P, S> LifecycleController<'a, P, S>
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
            store,
            table,
            launcher: Launcher::new(config, store, table, spawner),
            terminator: Terminator::new(store, table),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_death_wait(mut self, death_wait: PollBudget) -> Self {
        self.terminator = self.terminator.with_death_wait(death_wait);
        self
    }

    pub(crate) fn run<W: Write, E: Write>(
        &self,
        invocation: &LifecycleInvocation,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<CommandReport, LifecycleError> {
        let command = invocation.command;
        let conf_file = if command.launches() {
            resolve_conf_file(invocation.conf_file.as_deref())
        } else {
            if let Some(path) = &invocation.conf_file {
                debug!(
                    target: LIFECYCLE_TARGET,
                    %command,
                    path = %path.display(),
                    "configuration path ignored"
                );
            }
            None
        };

        let mut report = CommandReport::default();
        for server in invocation.selection.servers() {
            let status = self.apply(command, server, conf_file.as_deref(), output)?;
            report.record(status);
        }
        Ok(report)
    }

    fn apply<W: Write, E: Write>(
        &self,
        command: LifecycleCommand,
        server: ServerName,
        conf_file: Option<&Path>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<Option<i32>, LifecycleError> {
        debug!(target: LIFECYCLE_TARGET, %command, %server, "handling server");
        match command {
            LifecycleCommand::Start => self.start(server, conf_file, output),
            LifecycleCommand::Stop => self.stop(server, false, output),
            LifecycleCommand::Shutdown => self.stop(server, true, output),
            LifecycleCommand::Restart => {
                self.stop(server, false, output)?;
                self.start(server, conf_file, output)
            }
            LifecycleCommand::Reload | LifecycleCommand::ForceReload => {
                self.stop(server, true, output)?;
                self.start(server, conf_file, output)
            }
            LifecycleCommand::Status => self.status(server, output),
        }
    }

    fn start<W: Write, E: Write>(
        &self,
        server: ServerName,
        conf_file: Option<&Path>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<Option<i32>, LifecycleError> {
        let outcome = self.launcher.start(server, conf_file, output)?;
        Ok(outcome.exit_status())
    }

    fn stop<W: Write, E: Write>(
        &self,
        server: ServerName,
        graceful: bool,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<Option<i32>, LifecycleError> {
        if let StopOutcome::Signalled { pids, survivors } =
            self.terminator.stop(server, graceful, output)?
        {
            debug!(
                target: LIFECYCLE_TARGET,
                %server,
                signalled = pids.len(),
                survivors = survivors.len(),
                "stop finished"
            );
        }
        Ok(None)
    }

    fn status<W: Write, E: Write>(
        &self,
        server: ServerName,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<Option<i32>, LifecycleError> {
        let mut reported = false;
        for entry in self.store.records(server) {
            let record = entry?;
            reported = true;
            if self.table.is_alive(record.pid()) {
                output.stdout_line(format_args!(
                    "{server} (pid {}) is running...",
                    record.pid()
                ))?;
            } else {
                output.stdout_line(format_args!(
                    "{server} is stopped (stale pid file {})",
                    record.path().display()
                ))?;
            }
        }
        if !reported {
            output.stdout_line(format_args!("{server} is stopped"))?;
        }
        Ok(None)
    }
}
