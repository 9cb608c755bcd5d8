//! Info providers the agent answers without help from the embedding host.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use super::errors::DispatchError;
use super::operation::{OperationTable, from_fn};

/// Provider name for the platform description.
pub const SYSTEM_PLATFORM: &str = "system_platform";
/// Provider name for clock readings.
pub const TIME: &str = "time";

/// Target the agent was built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    pub os: &'static str,
    pub family: &'static str,
    pub arch: &'static str,
}

impl PlatformInfo {
    /// Reads the compile-time target description.
    #[must_use]
    pub const fn current() -> Self {
        Self {
            os: std::env::consts::OS,
            family: std::env::consts::FAMILY,
            arch: std::env::consts::ARCH,
        }
    }
}

/// Clock readings, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeInfo {
    /// Seconds since the agent started.
    pub agent: f64,
    /// Unix timestamp of the agent start.
    pub agent_ts: f64,
    /// Current Unix timestamp.
    pub system_ts: f64,
}

fn unix_seconds(at: SystemTime) -> f64 {
    at.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}

/// Builds the `system_platform` and `time` providers.
///
/// The agent start is captured when this is called.
#[must_use]
pub fn builtin_info() -> OperationTable {
    let started = Instant::now();
    let started_ts = unix_seconds(SystemTime::now());

    OperationTable::new()
        .with(
            SYSTEM_PLATFORM,
            from_fn(|_| Ok::<_, DispatchError>(PlatformInfo::current())),
        )
        .with(
            TIME,
            from_fn(move |_| {
                Ok::<_, DispatchError>(TimeInfo {
                    agent: started.elapsed().as_secs_f64(),
                    agent_ts: started_ts,
                    system_ts: unix_seconds(SystemTime::now()),
                })
            }),
        )
}
