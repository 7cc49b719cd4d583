//! Best-effort resource limit preparation for launched servers.

use nix::libc::rlim_t;
use nix::sys::resource::{Resource, setrlimit};
use tracing::{debug, warn};

use super::LIFECYCLE_TARGET;

/// Open file descriptor ceiling requested for servers.
pub(crate) const MAX_DESCRIPTORS: rlim_t = 32_768;
/// Data segment ceiling requested for servers (2 GiB).
pub(crate) const MAX_DATA_BYTES: rlim_t = 2 * 1024 * 1024 * 1024;

/// Sets the descriptor and data-segment limits inherited by spawned servers.
///
/// Unprivileged callers commonly cannot raise hard limits, so failures are
/// logged and otherwise ignored.
pub(crate) fn raise_resource_limits() {
    apply(Resource::RLIMIT_NOFILE, MAX_DESCRIPTORS);
    apply(Resource::RLIMIT_DATA, MAX_DATA_BYTES);
}

fn apply(resource: Resource, ceiling: rlim_t) {
    match setrlimit(resource, ceiling, ceiling) {
        Ok(()) => debug!(
            target: LIFECYCLE_TARGET,
            ?resource,
            ceiling,
            "resource limit applied"
        ),
        Err(errno) => warn!(
            target: LIFECYCLE_TARGET,
            ?resource,
            ceiling,
            %errno,
            "unable to raise resource limit"
        ),
    }
}
