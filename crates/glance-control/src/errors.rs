//! Error types for the CLI runtime.

use glance_config::UnknownServerError;
use strum::VariantNames;
use thiserror::Error;

use crate::lifecycle::{LifecycleCommand, LifecycleError};
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    UnknownServer(#[from] UnknownServerError),
    #[error("unknown command '{0}'; expected one of: {expected}", expected = LifecycleCommand::VARIANTS.join(", "))]
    UnknownCommand(String),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("{0}")]
    Lifecycle(#[from] LifecycleError),
}

impl AppError {
    /// Whether the error stems from malformed positionals that clap itself
    /// accepted, so the caller should follow it with a usage line.
    pub(crate) const fn wants_usage(&self) -> bool {
        matches!(self, Self::UnknownServer(_) | Self::UnknownCommand(_))
    }
}
