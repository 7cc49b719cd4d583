//! Shared configuration for the `glance-control` supervisor.
//!
//! The crate owns the closed set of manageable servers, the option group
//! recognised on the command line, and the defaults applied when an option is
//! omitted. The supervisor treats these settings as read-only for the whole
//! invocation.

mod defaults;
mod logging;
mod server;
mod settings;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_PID_DIR, EGG_CACHE_ENV_VAR, SERVER_PREFIX, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use server::{ServerName, ServerSelection, UnknownServerError};
pub use settings::Config;
