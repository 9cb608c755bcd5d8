use std::time::Duration;

/// Default log filter expression used by the agent.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Delay between attempts while the management host refuses connections.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

/// Time the management host has to echo the greeting.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 60_000;

/// Default log filter expression used by the agent.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the agent.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default pause between connection-refused retries.
#[must_use]
pub const fn default_reconnect_delay() -> Duration {
    Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS)
}

/// Default handshake deadline.
#[must_use]
pub const fn default_handshake_timeout() -> Duration {
    Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS)
}
