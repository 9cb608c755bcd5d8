//! BDD test world: loader, reporter, and bootstrap outcome shared by steps.

use std::cell::RefCell;
use std::sync::Arc;

use guestool_config::Config;

use crate::bootstrap::{Agent, BootstrapError, ConfigLoader, StaticConfigLoader, bootstrap_with};
use crate::dispatch::OperationTable;
use crate::host::MatcherManager;

use super::config_loader::{FailingConfigLoader, config_for, disabled_config};
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across bootstrap steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingHealthReporter>,
    agent: Option<Agent>,
    bootstrap_error: Option<BootstrapError>,
}

impl TestWorld {
    /// Builds a world for an agent without a management host.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(StaticConfigLoader(disabled_config())),
            reporter: Arc::new(RecordingHealthReporter::default()),
            agent: None,
            bootstrap_error: None,
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
        self.reset_results();
    }

    /// Installs a loader returning `config`.
    pub fn use_config(&mut self, config: Config) {
        self.loader = Box::new(StaticConfigLoader(config));
        self.reset_results();
    }

    /// Installs a loader pointing at `url`.
    pub fn use_host_url(&mut self, url: &str) {
        self.use_config(config_for(url));
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.agent.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        match bootstrap_with(
            &*self.loader,
            self.reporter.clone(),
            Arc::new(MatcherManager::new()),
            OperationTable::new(),
        ) {
            Ok(agent) => self.agent = Some(agent),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Returns whether bootstrap produced an error.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// The bootstrapped agent, if bootstrap succeeded.
    #[must_use]
    pub fn agent(&self) -> Option<&Agent> {
        self.agent.as_ref()
    }

    fn reset_results(&mut self) {
        self.agent = None;
        self.bootstrap_error = None;
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture constructor used by the behaviour suite.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
