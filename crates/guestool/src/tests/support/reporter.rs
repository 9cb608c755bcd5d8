//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;
use std::time::Duration;

use guestool_config::{Config, HostEndpoint};

use crate::bootstrap::BootstrapError;
use crate::connection::ConnectionError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    AgentDisabled,
    Connecting,
    ConnectionRefused,
    Connected,
    ConnectionFailed(String),
    Disconnected,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }

    /// Number of recorded events equal to `event`.
    #[must_use]
    pub fn count(&self, event: &HealthEvent) -> usize {
        self.events().iter().filter(|seen| *seen == event).count()
    }

    /// Polls until `predicate` holds for the recorded events.
    pub async fn wait_until(&self, predicate: impl Fn(&[HealthEvent]) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !predicate(&self.events()) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for health events: {:?}", self.events()));
    }

    /// The message of the first connection failure, if any.
    #[must_use]
    pub fn connection_failure(&self) -> Option<String> {
        self.events().into_iter().find_map(|event| match event {
            HealthEvent::ConnectionFailed(message) => Some(message),
            _ => None,
        })
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn agent_disabled(&self) {
        self.record(HealthEvent::AgentDisabled);
    }

    fn connecting(&self, _endpoint: &HostEndpoint) {
        self.record(HealthEvent::Connecting);
    }

    fn connection_refused(&self, _endpoint: &HostEndpoint, _retry_in: Duration) {
        self.record(HealthEvent::ConnectionRefused);
    }

    fn connected(&self, _endpoint: &HostEndpoint) {
        self.record(HealthEvent::Connected);
    }

    fn connection_failed(&self, _endpoint: &HostEndpoint, error: &ConnectionError) {
        self.record(HealthEvent::ConnectionFailed(error.to_string()));
    }

    fn disconnected(&self, _endpoint: &HostEndpoint) {
        self.record(HealthEvent::Disconnected);
    }
}
