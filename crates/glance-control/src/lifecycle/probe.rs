//! Access to the OS process table: liveness probes and signal delivery.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::warn;

use super::LIFECYCLE_TARGET;

/// Seam over the host process table so lifecycle flows can be exercised
/// without real processes.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait ProcessTable {
    /// Reports whether a process with this PID currently exists.
    ///
    /// The PID does not need to be a child of the caller.
    fn is_alive(&self, pid: u32) -> bool;

    /// Delivers `signal` to the process.
    fn signal(&self, pid: u32, signal: Signal) -> Result<(), Errno>;
}

/// Production process table backed by `kill(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
    fn is_alive(&self, pid: u32) -> bool {
        let Some(target) = to_target(pid) else {
            return false;
        };
        match kill(target, None) {
            Ok(()) | Err(Errno::EPERM) => true,
            Err(Errno::ESRCH) => false,
            Err(errno) => {
                warn!(
                    target: LIFECYCLE_TARGET,
                    pid,
                    %errno,
                    "liveness probe failed; treating process as gone"
                );
                false
            }
        }
    }

    fn signal(&self, pid: u32, signal: Signal) -> Result<(), Errno> {
        let target = to_target(pid).ok_or(Errno::EINVAL)?;
        kill(target, signal)
    }
}

/// Converts a recorded PID into a signal target.
///
/// Zero and values beyond `i32::MAX` would address a process group or every
/// process the caller may signal, so they are refused outright.
fn to_target(pid: u32) -> Option<Pid> {
    i32::try_from(pid)
        .ok()
        .filter(|raw| *raw > 0)
        .map(Pid::from_raw)
}
