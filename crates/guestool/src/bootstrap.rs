//! Agent bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use guestool_config::{Config, HostEndpointParseError};

use crate::connection::{ConnectionManager, ConnectionSettings, ConnectionState};
use crate::dispatch::{MessageRouter, OperationTable, builtin_info, matcher_actions};
use crate::health::HealthReporter;
use crate::host::MatcherManager;
use crate::registry::MatcherRegistry;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the agent configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a fixed configuration, for embedders that resolve
/// configuration themselves.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader(pub Config);

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.0.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        #[source]
        source: TelemetryError,
    },
    /// `connection_hosturl` is set but unusable.
    #[error("invalid management host URL: {source}")]
    Endpoint {
        #[source]
        source: HostEndpointParseError,
    },
}

/// A bootstrapped agent, ready to be started.
pub struct Agent {
    config: Config,
    registry: Arc<MatcherRegistry>,
    router: Arc<MessageRouter>,
    connection: ConnectionManager,
    telemetry: TelemetryHandle,
}

impl Agent {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The registry tracking the host's matchers.
    #[must_use]
    pub fn registry(&self) -> &Arc<MatcherRegistry> {
        &self.registry
    }

    /// The router serving management requests.
    #[must_use]
    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    /// The connection to the management host.
    #[must_use]
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Whether a management host is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.connection.endpoint().is_some()
    }

    /// Starts connecting; a no-op for a disabled agent.
    pub fn start(&self) {
        self.connection.start();
    }

    /// Shuts the connection down.
    pub async fn stop(&self) {
        self.connection.stop().await;
    }

    /// Resolves once the connection is finished for good.
    pub async fn closed(&self) {
        self.connection.closed().await;
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }
}

/// Bootstraps the agent using the supplied collaborators.
///
/// `host` is the embedding runtime's matcher manager and `info` its info
/// providers; they take precedence over the built-in providers of the same
/// name.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration cannot be loaded, telemetry
/// cannot be installed, or the management host URL is malformed.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    host: Arc<MatcherManager>,
    info: OperationTable,
) -> Result<Agent, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let endpoint = match config.host_endpoint() {
        Ok(endpoint) => endpoint,
        Err(source) => {
            let error = BootstrapError::Endpoint { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let registry = MatcherRegistry::install(host);
    let router = Arc::new(MessageRouter::new(
        builtin_info().merge(info),
        matcher_actions(&registry),
    ));
    let connection = ConnectionManager::new(
        endpoint,
        ConnectionSettings::from(&config),
        Arc::clone(&router),
        Arc::clone(&reporter),
    );
    reporter.bootstrap_succeeded(&config);

    Ok(Agent {
        config,
        registry,
        router,
        connection,
        telemetry,
    })
}
