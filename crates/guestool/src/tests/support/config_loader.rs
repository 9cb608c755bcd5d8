//! Configuration helpers for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use guestool_config::Config;
use ortho_config::{OrthoConfig, OrthoError};

use crate::bootstrap::ConfigLoader;

/// Configuration pointing at `url` with delays short enough for tests.
#[must_use]
pub fn config_for(url: &str) -> Config {
    Config {
        connection_hosturl: url.to_owned(),
        reconnect_delay_ms: 50,
        handshake_timeout_ms: 2_000,
        ..Config::default()
    }
}

/// Configuration without a management host.
#[must_use]
pub fn disabled_config() -> Config {
    Config::default()
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("guestool"),
            OsString::from("--reconnect-delay-ms"),
            OsString::from("soon"),
        ];
        Config::load_from_iter(args)
    }
}
