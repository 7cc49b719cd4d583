//! Lifecycle management for the glance servers.
//!
//! This module is split into focused submodules so each concern remains small and
//! testable:
//! - [`types`] defines the user-facing command models and IO helpers.
//! - [`error`] captures the error surface exposed to the CLI.
//! - [`pidfile`] resolves, reads and writes PID files.
//! - [`probe`] wraps the OS process table behind a mockable trait.
//! - [`poll`] provides bounded probe-and-sleep loops.
//! - [`limits`] raises resource limits inherited by launched servers.
//! - [`sink`] chooses where server output goes.
//! - [`spawning`] creates detached server processes.
//! - [`launch`] sequences a server start.
//! - [`shutdown`] signals servers and waits for them to exit.
//! - [`controller`] maps commands onto start and stop flows per server.

mod controller;
mod error;
mod launch;
mod limits;
mod pidfile;
mod poll;
mod probe;
mod shutdown;
mod sink;
mod spawning;
#[cfg(test)]
mod test_support;
mod types;

pub use controller::SystemLifecycle;
pub use error::LifecycleError;
pub use types::{CommandReport, LifecycleCommand, LifecycleInvocation, LifecycleOutput};

/// Tracing target for lifecycle events.
pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");
