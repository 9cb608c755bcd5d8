//! Structured health reporting for agent lifecycle events.

use std::sync::Arc;
use std::time::Duration;

use crate::bootstrap::BootstrapError;
use crate::connection::ConnectionError;

use guestool_config::{Config, HostEndpoint};

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked when no management host is configured.
    fn agent_disabled(&self);

    /// Invoked before each connection attempt.
    fn connecting(&self, endpoint: &HostEndpoint);

    /// Invoked when the management host refused the connection and a retry
    /// has been scheduled.
    fn connection_refused(&self, endpoint: &HostEndpoint, retry_in: Duration);

    /// Invoked once the greeting has been echoed.
    fn connected(&self, endpoint: &HostEndpoint);

    /// Invoked when an attempt or an active session fails for good.
    fn connection_failed(&self, endpoint: &HostEndpoint, error: &ConnectionError);

    /// Invoked after an active session has ended and its requests have been
    /// drained.
    fn disconnected(&self, endpoint: &HostEndpoint);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn agent_disabled(&self) {
        (**self).agent_disabled();
    }

    fn connecting(&self, endpoint: &HostEndpoint) {
        (**self).connecting(endpoint);
    }

    fn connection_refused(&self, endpoint: &HostEndpoint, retry_in: Duration) {
        (**self).connection_refused(endpoint, retry_in);
    }

    fn connected(&self, endpoint: &HostEndpoint) {
        (**self).connected(endpoint);
    }

    fn connection_failed(&self, endpoint: &HostEndpoint, error: &ConnectionError) {
        (**self).connection_failed(endpoint, error);
    }

    fn disconnected(&self, endpoint: &HostEndpoint) {
        (**self).disconnected(endpoint);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: "guestool::health",
            event = "bootstrap_starting",
            "starting agent bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: "guestool::health",
            event = "bootstrap_succeeded",
            host_url = %config.connection_hosturl,
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "agent bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "guestool::health",
            event = "bootstrap_failed",
            error = %error,
            "agent bootstrap failed"
        );
    }

    fn agent_disabled(&self) {
        tracing::info!(
            target: "guestool::health",
            event = "agent_disabled",
            "no management host configured; agent disabled"
        );
    }

    fn connecting(&self, endpoint: &HostEndpoint) {
        tracing::info!(
            target: "guestool::health",
            event = "connecting",
            endpoint = %endpoint,
            "connecting to management host"
        );
    }

    fn connection_refused(&self, endpoint: &HostEndpoint, retry_in: Duration) {
        tracing::warn!(
            target: "guestool::health",
            event = "connection_refused",
            endpoint = %endpoint,
            retry_in_ms = u64::try_from(retry_in.as_millis()).unwrap_or(u64::MAX),
            "management host refused the connection; retry scheduled"
        );
    }

    fn connected(&self, endpoint: &HostEndpoint) {
        tracing::info!(
            target: "guestool::health",
            event = "connected",
            endpoint = %endpoint,
            "handshake with management host completed"
        );
    }

    fn connection_failed(&self, endpoint: &HostEndpoint, error: &ConnectionError) {
        tracing::error!(
            target: "guestool::health",
            event = "connection_failed",
            endpoint = %endpoint,
            error = %error,
            "connection to management host failed"
        );
    }

    fn disconnected(&self, endpoint: &HostEndpoint) {
        tracing::info!(
            target: "guestool::health",
            event = "disconnected",
            endpoint = %endpoint,
            "management host connection dropped"
        );
    }
}
