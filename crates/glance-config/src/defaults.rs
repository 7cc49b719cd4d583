/// Directory holding per-server PID files when no override is supplied.
pub const DEFAULT_PID_DIR: &str = "/var/run/glance";

/// Prefix applied to bare server names (`api` becomes `glance-api`).
pub const SERVER_PREFIX: &str = "glance-";

/// Environment variable pointing launched servers at a scratch package cache.
pub const EGG_CACHE_ENV_VAR: &str = "PYTHON_EGG_CACHE";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}
