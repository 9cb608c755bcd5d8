//! Outbound connection to the management host.
//!
//! The agent dials the configured WebSocket endpoint, greets the host, and
//! then serves requests until the host says bye or the transport drops.
//!
//! ```text
//! Disconnected -> Connecting -> Handshaking -> Active -> Draining -> Closed
//!      ^              |
//!      +-- refused ---+
//! ```
//!
//! Only a refused connection is retried, after a fixed delay, by an explicit
//! loop in the supervisor task. A handshake timeout or mismatch, any other
//! connect failure, and a dropped active session all end in `Closed`; the
//! embedding process carries on either way.

mod errors;
mod session;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use guestool_config::{
    Config, HostEndpoint, default_handshake_timeout, default_reconnect_delay,
};
use strum::Display;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dispatch::MessageRouter;
use crate::health::HealthReporter;

pub use errors::ConnectionError;

/// Tracing target for connection lifecycle events.
pub(crate) const CONNECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");

/// Lifecycle position of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected; also the state while waiting to retry.
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// Waiting for the greeting echo.
    Handshaking,
    /// Serving requests.
    Active,
    /// Cancelling outstanding requests and closing the transport.
    Draining,
    /// Finished; the manager will not connect again.
    Closed,
}

/// Timing knobs for the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Wait between refused attempts.
    pub reconnect_delay: Duration,
    /// Deadline for the greeting echo.
    pub handshake_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: default_reconnect_delay(),
            handshake_timeout: default_handshake_timeout(),
        }
    }
}

impl From<&Config> for ConnectionSettings {
    fn from(config: &Config) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay(),
            handshake_timeout: config.handshake_timeout(),
        }
    }
}

/// Owns the supervisor task driving the connection.
pub struct ConnectionManager {
    endpoint: Option<HostEndpoint>,
    settings: ConnectionSettings,
    router: Arc<MessageRouter>,
    reporter: Arc<dyn HealthReporter>,
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Creates a manager. `endpoint` of `None` disables it.
    #[must_use]
    pub fn new(
        endpoint: Option<HostEndpoint>,
        settings: ConnectionSettings,
        router: Arc<MessageRouter>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            endpoint,
            settings,
            router,
            reporter,
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            supervisor: Mutex::new(None),
        }
    }

    /// The configured endpoint, if any.
    #[must_use]
    pub const fn endpoint(&self) -> Option<&HostEndpoint> {
        self.endpoint.as_ref()
    }

    /// Spawns the supervisor on the current tokio runtime.
    ///
    /// Does nothing when no endpoint is configured, when already started, or
    /// after [`stop`](Self::stop).
    pub fn start(&self) {
        let Some(endpoint) = self.endpoint.clone() else {
            self.reporter.agent_disabled();
            self.state.send_replace(ConnectionState::Closed);
            return;
        };

        let mut supervisor = self.lock_supervisor();
        if supervisor.is_some() || self.cancel.is_cancelled() {
            debug!(target: CONNECTION_TARGET, "connection already started or stopped");
            return;
        }

        let task = Supervisor {
            endpoint,
            settings: self.settings,
            router: Arc::clone(&self.router),
            reporter: Arc::clone(&self.reporter),
            state: Arc::clone(&self.state),
            cancel: self.cancel.clone(),
        };
        *supervisor = Some(tokio::spawn(task.run()));
    }

    /// Cancels any pending retry or active session and waits for it to wind
    /// down. Safe to call repeatedly.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.lock_supervisor().take();
        if let Some(handle) = handle
            && let Err(error) = handle.await
        {
            warn!(target: CONNECTION_TARGET, error = %error, "connection supervisor failed");
        }
        self.state.send_replace(ConnectionState::Closed);
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Resolves once the connection has reached [`ConnectionState::Closed`].
    pub async fn closed(&self) {
        let mut receiver = self.state.subscribe();
        let _ = receiver
            .wait_for(|state| *state == ConnectionState::Closed)
            .await;
    }

    fn lock_supervisor(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Supervisor {
    endpoint: HostEndpoint,
    settings: ConnectionSettings,
    router: Arc<MessageRouter>,
    reporter: Arc<dyn HealthReporter>,
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
}

impl Supervisor {
    async fn run(self) {
        loop {
            self.enter(ConnectionState::Connecting);
            self.reporter.connecting(&self.endpoint);

            let attempt = tokio::select! {
                () = self.cancel.cancelled() => break,
                attempt = tokio_tungstenite::connect_async(self.endpoint.as_str()) => attempt,
            };

            match attempt {
                Ok((stream, _response)) => {
                    self.serve(stream).await;
                    break;
                }
                Err(error) => {
                    let error = ConnectionError::from_connect(self.endpoint.as_str(), error);
                    if !error.is_retryable() {
                        self.reporter.connection_failed(&self.endpoint, &error);
                        break;
                    }
                    self.enter(ConnectionState::Disconnected);
                    self.reporter
                        .connection_refused(&self.endpoint, self.settings.reconnect_delay);
                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        () = tokio::time::sleep(self.settings.reconnect_delay) => {}
                    }
                }
            }
        }
        self.enter(ConnectionState::Closed);
    }

    async fn serve(&self, mut stream: session::HostStream) {
        self.enter(ConnectionState::Handshaking);
        let greeted = tokio::select! {
            () = self.cancel.cancelled() => None,
            greeted = session::handshake(&mut stream, self.settings.handshake_timeout) => {
                Some(greeted)
            }
        };

        match greeted {
            None => session::close(stream).await,
            Some(Err(error)) => {
                self.reporter.connection_failed(&self.endpoint, &error);
                session::close(stream).await;
            }
            Some(Ok(())) => {
                self.enter(ConnectionState::Active);
                self.reporter.connected(&self.endpoint);
                let served =
                    session::serve(stream, Arc::clone(&self.router), &self.state, &self.cancel)
                        .await;
                if let Err(error) = served {
                    self.reporter.connection_failed(&self.endpoint, &error);
                }
                self.reporter.disconnected(&self.endpoint);
            }
        }
    }

    fn enter(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(
                target: CONNECTION_TARGET,
                from = %previous,
                to = %next,
                "connection state changed"
            );
        }
    }
}
