//! Server process spawning.
//!
//! A [`SpawnSpec`] describes everything needed to start a server: the
//! executable, its arguments and environment, where each standard stream goes
//! and whether the child detaches into its own session. [`SystemSpawner`]
//! realises one with `std::process::Command` and a pre-exec hook.

use std::ffi::OsString;
use std::io;
use std::os::fd::OwnedFd;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use nix::unistd::setsid;

use super::limits::raise_resource_limits;

/// Destination for one standard stream of a spawned server.
#[derive(Debug)]
pub(crate) enum Redirect {
    /// `/dev/null`.
    Null,
    /// An already-open file descriptor, such as the write end of a pipe.
    Fd(OwnedFd),
}

impl From<Redirect> for Stdio {
    fn from(redirect: Redirect) -> Self {
        match redirect {
            Redirect::Null => Self::null(),
            Redirect::Fd(fd) => Self::from(fd),
        }
    }
}

/// Everything needed to start one server process.
#[derive(Debug)]
pub(crate) struct SpawnSpec {
    pub(crate) executable: PathBuf,
    pub(crate) args: Vec<OsString>,
    pub(crate) env: Vec<(OsString, OsString)>,
    pub(crate) stdin: Redirect,
    pub(crate) stdout: Redirect,
    pub(crate) stderr: Redirect,
    pub(crate) detach_session: bool,
}

/// A started server process the launcher may still observe.
pub(crate) trait ChildHandle {
    fn id(&self) -> u32;

    /// Returns the exit code if the process has already exited.
    fn try_exit_code(&mut self) -> io::Result<Option<i32>>;
}

impl ChildHandle for Child {
    fn id(&self) -> u32 {
        Self::id(self)
    }

    fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        Ok(self.try_wait()?.map(exit_code))
    }
}

/// Seam over process creation.
pub(crate) trait Spawner {
    fn spawn(&self, spec: SpawnSpec) -> io::Result<Box<dyn ChildHandle>>;
}

/// Spawner backed by `fork`/`exec` through `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SystemSpawner;

impl Spawner for SystemSpawner {
    fn spawn(&self, spec: SpawnSpec) -> io::Result<Box<dyn ChildHandle>> {
        raise_resource_limits();
        let mut command = Command::new(&spec.executable);
        command
            .args(&spec.args)
            .envs(spec.env)
            .stdin(Stdio::from(spec.stdin))
            .stdout(Stdio::from(spec.stdout))
            .stderr(Stdio::from(spec.stderr));
        if spec.detach_session {
            // SAFETY: the hook runs between fork and exec and only calls
            // `setsid(2)`, which is async-signal-safe and allocates nothing.
            unsafe {
                command.pre_exec(|| setsid().map(drop).map_err(io::Error::from));
            }
        }
        let child = command.spawn()?;
        Ok(Box::new(child))
    }
}

/// Normalises an exit status into a shell-style exit code.
///
/// Processes killed by a signal report `128 + signo`.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signo| 128 + signo))
        .unwrap_or(1)
}
