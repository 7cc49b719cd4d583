//! CLI argument definitions for the glance supervisor.

use std::path::PathBuf;

use clap::Parser;
use glance_config::{Config, ServerSelection};

use crate::errors::AppError;
use crate::lifecycle::{LifecycleCommand, LifecycleInvocation};

/// Command-line interface for `glance-control`.
#[derive(Parser, Debug)]
#[command(
    name = "glance-control",
    version,
    about = "Starts, stops and reloads the glance servers."
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: Config,
    /// Server to act on: all, api, registry or scrubber (a `glance-` prefix is
    /// accepted).
    #[arg(value_name = "SERVER")]
    pub(crate) server: String,
    /// Lifecycle command: start, stop, shutdown, restart, reload, force-reload
    /// or status.
    #[arg(value_name = "COMMAND")]
    pub(crate) command: String,
    /// Configuration file handed to launched servers as `--config-file`.
    #[arg(value_name = "CONF_PATH")]
    pub(crate) conf_path: Option<PathBuf>,
}

impl TryFrom<&Cli> for LifecycleInvocation {
    type Error = AppError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let selection = cli.server.parse::<ServerSelection>()?;
        let command = cli
            .command
            .parse::<LifecycleCommand>()
            .map_err(|_| AppError::UnknownCommand(cli.command.clone()))?;
        Ok(Self {
            selection,
            command,
            conf_file: cli.conf_path.clone(),
        })
    }
}
