//! Test harness utilities for the agent suites.

mod config_loader;
mod host;
mod reporter;
mod world;

pub use config_loader::{FailingConfigLoader, config_for, disabled_config};
pub use host::{FakeHost, refused_url};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{TestWorld, world};
