//! Shared configuration for the guest management agent.
//!
//! Configuration is layered with [`ortho_config`]: command-line flags take
//! precedence over `GUEST_*` environment variables, which in turn override a
//! `.guest.toml` file and finally the built-in defaults. The only setting the
//! management host is expected to provide is `connection_hosturl`; leaving it
//! empty disables the agent entirely.

mod defaults;
mod endpoint;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HANDSHAKE_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_RECONNECT_DELAY_MS,
    default_handshake_timeout, default_log_filter, default_log_filter_string, default_log_format,
    default_reconnect_delay,
};
pub use endpoint::{HostEndpoint, HostEndpointParseError};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "GUEST")]
pub struct Config {
    /// Management host WebSocket URL. Empty disables the agent.
    #[ortho_config(default = String::new())]
    pub connection_hosturl: String,
    /// Tracing filter expression.
    #[ortho_config(default = crate::defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log records.
    #[ortho_config(default = crate::defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Milliseconds to wait before retrying a refused connection.
    #[ortho_config(default = crate::defaults::DEFAULT_RECONNECT_DELAY_MS)]
    pub reconnect_delay_ms: u64,
    /// Milliseconds the management host has to echo the greeting.
    #[ortho_config(default = crate::defaults::DEFAULT_HANDSHAKE_TIMEOUT_MS)]
    pub handshake_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection_hosturl: String::new(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Parses the configured management host URL.
    ///
    /// Returns `Ok(None)` when the URL is empty, which disables the agent.
    ///
    /// # Errors
    ///
    /// Returns [`HostEndpointParseError`] when a non-empty value is not a
    /// valid `ws://` or `wss://` URL.
    pub fn host_endpoint(&self) -> Result<Option<HostEndpoint>, HostEndpointParseError> {
        let raw = self.connection_hosturl.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some)
    }

    /// Whether a management host URL has been supplied at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.connection_hosturl.trim().is_empty()
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for log records.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Delay between connection-refused retries.
    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Deadline for the greeting echo.
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}
