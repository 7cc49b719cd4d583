//! The closed set of servers the supervisor knows how to manage.

use std::str::FromStr;

use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;

use crate::defaults::SERVER_PREFIX;

/// A manageable server, named after the binary that implements it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum ServerName {
    /// The image API server.
    #[strum(serialize = "glance-api")]
    Api,
    /// The image registry server.
    #[strum(serialize = "glance-registry")]
    Registry,
    /// The background scrubber.
    #[strum(serialize = "glance-scrubber")]
    Scrubber,
}

impl ServerName {
    /// Name of the executable launched for this server.
    #[must_use]
    pub fn binary_name(self) -> &'static str {
        self.into()
    }

    /// Whether the server treats `SIGHUP` as "finish in-flight work and exit".
    ///
    /// Servers outside this set receive `SIGTERM` even when a graceful stop is
    /// requested.
    #[must_use]
    pub const fn supports_graceful_shutdown(self) -> bool {
        matches!(self, Self::Api | Self::Registry)
    }

    /// Every server, in the order `all` expands to.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

impl FromStr for ServerName {
    type Err = UnknownServerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let bare = raw.strip_prefix(SERVER_PREFIX).unwrap_or(raw);
        match bare {
            "api" => Ok(Self::Api),
            "registry" => Ok(Self::Registry),
            "scrubber" => Ok(Self::Scrubber),
            _ => Err(UnknownServerError {
                name: raw.to_owned(),
            }),
        }
    }
}

/// The servers targeted by a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSelection {
    /// Every known server.
    All,
    /// A single named server.
    One(ServerName),
}

impl ServerSelection {
    /// Expands the selection into the servers it names.
    #[must_use]
    pub fn servers(self) -> Vec<ServerName> {
        match self {
            Self::All => ServerName::all().collect(),
            Self::One(server) => vec![server],
        }
    }
}

impl FromStr for ServerSelection {
    type Err = UnknownServerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == "all" {
            return Ok(Self::All);
        }
        raw.parse().map(Self::One)
    }
}

/// Raised when a server argument names nothing in the known set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown server '{name}'; expected one of: all, api, registry, scrubber")]
pub struct UnknownServerError {
    name: String,
}

impl UnknownServerError {
    /// The rejected server argument.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
