//! Guest-side management agent.
//!
//! The agent is embedded in a message-handling runtime and exposes it to an
//! external management host over one outbound WebSocket connection. Once the
//! host has echoed the agent's greeting it can:
//!
//! - query info providers (`/info/<name>`), and
//! - list, inspect, rewrite, and remove the runtime's matchers
//!   (`/action/matcher/...`).
//!
//! Every matcher the runtime registers gets a stable id from the
//! [`MatcherRegistry`]. A matcher's rule travels over the wire as a
//! [`RuleDescriptor`], and rewriting a rule or priority is applied to the live
//! matcher in place.
//!
//! [`bootstrap_with`] wires configuration, telemetry, the registry, the
//! router, and the [`ConnectionManager`] together. Lifecycle events go to a
//! [`HealthReporter`] so operators can follow what the agent is doing.

mod bootstrap;
pub mod connection;
pub mod dispatch;
mod health;
pub mod host;
pub mod registry;
pub mod telemetry;

pub use bootstrap::{
    Agent, BootstrapError, ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use connection::{ConnectionError, ConnectionManager, ConnectionSettings, ConnectionState};
pub use dispatch::{DispatchError, Message, MessageRouter, Operation, OperationTable};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use registry::{MatcherChange, MatcherInfo, MatcherRegistry, RegistryError, RuleDescriptor};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
